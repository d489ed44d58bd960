pub mod config;
pub mod duck;
pub mod process;

use anyhow::Result;
use tracing::info;

use crate::config::PipelineConfig;

/// What one run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSummary {
    pub loaded_rows: usize,
    pub saved_rows: usize,
    pub columns: Vec<String>,
}

/// Load → clean → save, printing a progress line before each stage.
pub fn run(cfg: &PipelineConfig) -> Result<PipelineSummary> {
    println!(
        "Loading data...\n    MESSAGES: {}\n    CATEGORIES: {}",
        cfg.messages_path.display(),
        cfg.categories_path.display()
    );
    let joined = process::load_data(&cfg.messages_path, &cfg.categories_path)?;

    println!("Cleaning data...");
    let cleaned = process::clean_data(&joined)?;

    println!("Saving data...\n    DATABASE: {}", cfg.database_path.display());
    let saved_rows = duck::save_data(&cleaned, &cfg.table_name)?;

    println!("Cleaned data saved to database!");
    info!(loaded = joined.num_rows(), saved = saved_rows, "pipeline finished");

    Ok(PipelineSummary {
        loaded_rows: joined.num_rows(),
        saved_rows,
        columns: cleaned.column_names(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::utils::quote_ident;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn end_to_end_help_and_food() -> Result<()> {
        let dir = tempdir()?;
        let messages = dir.path().join("messages.csv");
        let categories = dir.path().join("categories.csv");
        fs::write(&messages, "id,message\n1,help\n2,food needed\n")?;
        fs::write(
            &categories,
            "id,categories\n1,related-1;request-0\n2,related-1;request-1\n",
        )?;
        let db = dir.path().join("DisasterResponse.db");

        let cfg = PipelineConfig::from_args([
            messages.to_string_lossy().to_string(),
            categories.to_string_lossy().to_string(),
            db.to_string_lossy().to_string(),
        ])
        .expect("three arguments");
        let summary = run(&cfg)?;

        assert_eq!(summary.saved_rows, 2);
        assert_eq!(summary.columns, vec!["message", "related", "request"]);

        let conn = duck::open_disk_db(&db)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT message, related, request FROM {} ORDER BY message",
            quote_ident(&cfg.table_name)
        ))?;
        let rows: Vec<(String, i64, i64)> = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(
            rows,
            vec![
                ("food needed".to_string(), 1, 1),
                ("help".to_string(), 1, 0),
            ]
        );
        Ok(())
    }

    #[test]
    fn rerun_replaces_previous_output() -> Result<()> {
        let dir = tempdir()?;
        let messages = dir.path().join("m.csv");
        let categories = dir.path().join("c.csv");
        let db = dir.path().join("out.db");
        let cfg = PipelineConfig::from_args([
            messages.to_string_lossy().to_string(),
            categories.to_string_lossy().to_string(),
            db.to_string_lossy().to_string(),
        ])
        .expect("three arguments");

        fs::write(&messages, "id,message\n1,a\n2,b\n2,b\n")?;
        fs::write(&categories, "id,categories\n1,x-1\n2,x-0\n2,x-0\n")?;
        assert_eq!(run(&cfg)?.saved_rows, 2);

        fs::write(&messages, "id,message\n5,c\n")?;
        fs::write(&categories, "id,categories\n5,x-1\n")?;
        assert_eq!(run(&cfg)?.saved_rows, 1);

        let conn = duck::open_disk_db(&db)?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(&cfg.table_name)),
            [],
            |r| r.get(0),
        )?;
        assert_eq!(count, 1);
        Ok(())
    }

    #[test]
    fn bad_category_value_leaves_no_output() -> Result<()> {
        let dir = tempdir()?;
        let messages = dir.path().join("m.csv");
        let categories = dir.path().join("c.csv");
        let db = dir.path().join("out.db");
        fs::write(&messages, "id,message\n1,help\n")?;
        fs::write(&categories, "id,categories\n1,related-x\n")?;

        let cfg = PipelineConfig::from_args([
            messages.to_string_lossy().to_string(),
            categories.to_string_lossy().to_string(),
            db.to_string_lossy().to_string(),
        ])
        .expect("three arguments");
        assert!(run(&cfg).is_err());
        assert!(!db.exists());
        Ok(())
    }
}
