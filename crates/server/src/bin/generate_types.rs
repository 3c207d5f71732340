use std::{fs, path::Path};

use ts_rs::TS;

fn generate_types_content() -> String {
    let decls = [
        utils::response::ApiResponse::<(), ()>::decl(),
        server::routes::health::HealthStatus::decl(),
        db::models::DateRange::decl(),
        db::models::batiment::Batiment::decl(),
        db::models::batiment::CreateBatiment::decl(),
        db::models::batiment::UpdateBatiment::decl(),
        db::models::article::Article::decl(),
        db::models::article::CreateArticle::decl(),
        db::models::article::UpdateArticle::decl(),
        db::models::paramaitre::Paramaitre::decl(),
        db::models::paramaitre::UpdateParamaitre::decl(),
        db::models::mise_en_place::Espece::decl(),
        db::models::mise_en_place::LotStatusFilter::decl(),
        db::models::mise_en_place::MiseEnPlace::decl(),
        db::models::mise_en_place::CreateMiseEnPlace::decl(),
        db::models::mise_en_place::UpdateMiseEnPlace::decl(),
        db::models::paramsouche::Paramsouche::decl(),
        db::models::paramsouche::SaveParamsouche::decl(),
        db::models::paramsouche::CumulativeLosses::decl(),
        db::models::paramsouche::LotTotals::decl(),
        db::models::stock_entry::Ebe::decl(),
        db::models::stock_entry::Lbe::decl(),
        db::models::stock_entry::EbeWithLines::decl(),
        db::models::movement::Origine::decl(),
        db::models::movement::Sens::decl(),
        db::models::movement::NatureLigne::decl(),
        db::models::movement::Emvt::decl(),
        db::models::movement::Lmvt::decl(),
        db::models::movement::EmvtWithLines::decl(),
        db::models::movement::MovementFilter::decl(),
        db::models::journee::Journee::decl(),
        services::services::placement::CloseLot::decl(),
        services::services::stock_entry::CreateStockEntryLine::decl(),
        services::services::stock_entry::CreateStockEntry::decl(),
        services::services::movement::CreateMovementLine::decl(),
        services::services::movement::CreateMovement::decl(),
        services::services::figures::EggSplit::decl(),
        services::services::figures::LotFigures::decl(),
        services::services::figures::DayTotals::decl(),
        services::services::journal::ValidateDay::decl(),
        services::services::journal::DaySummary::decl(),
        services::services::journal::DayValidationReport::decl(),
        services::services::journal::DayReopenReport::decl(),
        services::services::journal::DayStatus::decl(),
        server::routes::journal::ValidateDayRequest::decl(),
        services::services::reports::DailyReport::decl(),
        services::services::reports::LotReportTotals::decl(),
        services::services::reports::LotReport::decl(),
        services::services::reports::StockReportLine::decl(),
        services::services::reports::StockReport::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|d| {
            let trimmed = d.trim_start();
            if trimmed.starts_with("export") {
                d
            } else {
                format!("export {trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "// This file was generated by `generate_types`. Do not edit it by hand.\n\n{body}\n"
    )
}

fn main() -> std::io::Result<()> {
    let check = std::env::args().any(|arg| arg == "--check");
    let shared = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../shared");
    let target = shared.join("types.ts");
    let content = generate_types_content();

    if check {
        let current = fs::read_to_string(&target).unwrap_or_default();
        if current == content {
            println!("shared/types.ts is up to date");
            return Ok(());
        }
        eprintln!("shared/types.ts is out of date; run generate_types");
        std::process::exit(1);
    }

    fs::create_dir_all(&shared)?;
    fs::write(&target, content)?;
    println!("Wrote {}", target.display());
    Ok(())
}
