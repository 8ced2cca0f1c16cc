//! CSV lead tables and the offline stages that reshape them

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::models::Business;

/// Columns every stage needs in its input table
pub const REQUIRED_COLUMNS: &[&str] = &["name"];

/// Columns the website lookup needs to search the directory
pub const WEBSITE_LOOKUP_COLUMNS: &[&str] = &["name", "locality"];

pub fn read_businesses(path: &Path, required: &[&str]) -> Result<Vec<Business>> {
    if !path.exists() {
        bail!("The input file '{}' was not found", path.display());
    }

    let file = File::open(path).with_context(|| format!("Could not open {}", path.display()))?;
    let rows = read_from(file, required)
        .with_context(|| format!("Could not read {}", path.display()))?;

    info!("Loaded {} businesses from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn read_from<R: Read>(reader: R, required: &[&str]) -> Result<Vec<Business>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?;
    for column in required {
        if !headers.iter().any(|header| header == *column) {
            bail!("The required column '{}' was not found", column);
        }
    }

    reader
        .deserialize()
        .map(|row| row.map_err(anyhow::Error::from))
        .collect()
}

pub fn write_businesses(path: &Path, rows: &[Business]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file =
        File::create(path).with_context(|| format!("Could not create {}", path.display()))?;
    write_to(file, rows)?;

    info!("Saved {} businesses to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_to<W: Write>(writer: W, rows: &[Business]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Sorts rows alphabetically by name so duplicates sit together for a
/// manual review pass.
pub fn sort_for_review(rows: &mut [Business]) {
    rows.sort_by(|a, b| a.name.cmp(&b.name));
}

/// Produces the final call list from a reviewed table.
///
/// Exact (name, phone) duplicates go first; then, for businesses listed at
/// several locations, only the highest-scored row survives. The result is
/// ordered by score, best first.
pub fn finalize(rows: Vec<Business>) -> Vec<Business> {
    let before = rows.len();

    let mut seen = HashSet::new();
    let mut rows: Vec<Business> = rows
        .into_iter()
        .filter(|row| seen.insert((row.name.clone(), row.phone.clone())))
        .collect();
    info!("List reduced to {} (from {}) after removing straight duplicates", rows.len(), before);

    rows.sort_by_key(|row| std::cmp::Reverse(row.score.unwrap_or(i64::MIN)));

    let mut seen_names = HashSet::new();
    let rows: Vec<Business> = rows
        .into_iter()
        .filter(|row| seen_names.insert(row.name.clone()))
        .collect();
    info!("List reduced to {} after consolidating multi-location businesses", rows.len());

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FilingStatus;

    fn row(name: &str, phone: &str, score: Option<i64>) -> Business {
        Business {
            name: name.to_string(),
            phone: phone.to_string(),
            score,
            ..Business::default()
        }
    }

    #[test]
    fn reads_tables_written_by_earlier_stages() {
        let csv = "name ,phone,address,locality,category,extra_column\n\
                   Smith CPA,(727) 555-0101,\"1 Main St, Largo\",Largo,Accountants,ignored\n";

        let rows = read_from(csv.as_bytes(), WEBSITE_LOOKUP_COLUMNS).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Smith CPA");
        assert_eq!(rows[0].address, "1 Main St, Largo");
        assert_eq!(rows[0].score, None);
        assert_eq!(rows[0].website, None);
    }

    #[test]
    fn written_rows_keep_enrichment_columns() {
        let mut business = row("Nemes & West", "(727) 555-0102", Some(60));
        business.registry_status = Some(FilingStatus::Active);
        business.is_chain = Some(false);
        business.website = Some("N/A".to_string());

        let mut out = Vec::new();
        write_to(&mut out, &[business.clone()]).unwrap();

        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("call_day,score,registry_status,status,notes,name,"));
        assert_eq!(read_from(out.as_slice(), REQUIRED_COLUMNS).unwrap(), vec![business]);
    }

    #[test]
    fn review_sorts_by_name() {
        let mut rows = vec![row("Zeta", "1", None), row("Alpha", "2", None), row("Beta", "3", None)];
        sort_for_review(&mut rows);

        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta", "Zeta"]);
    }

    #[test]
    fn finalize_keeps_best_location_per_business() {
        let rows = vec![
            row("Acme Law", "(727) 555-0001", Some(20)),
            row("Acme Law", "(727) 555-0001", Some(20)),
            row("Acme Law", "(727) 555-0002", Some(60)),
            row("Bay Plumbing", "(727) 555-0003", Some(10)),
            row("Unscored", "(727) 555-0004", None),
        ];

        let final_rows = finalize(rows);

        assert_eq!(final_rows.len(), 3);
        assert_eq!(final_rows[0].phone, "(727) 555-0002");
        assert_eq!(final_rows[1].name, "Bay Plumbing");
        assert_eq!(final_rows[2].name, "Unscored");
    }

    #[test]
    fn missing_input_file_is_reported() {
        let err = read_businesses(Path::new("definitely/not/here.csv"), REQUIRED_COLUMNS)
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn table_without_name_column_is_rejected() {
        let csv = "company,telephone\nSmith CPA,(727) 555-0101\n";

        let err = read_from(csv.as_bytes(), REQUIRED_COLUMNS).unwrap_err();
        assert_eq!(err.to_string(), "The required column 'name' was not found");
    }

    #[test]
    fn website_lookup_needs_locality_column() {
        let csv = "name,phone\nSmith CPA,(727) 555-0101\n";

        assert_eq!(read_from(csv.as_bytes(), REQUIRED_COLUMNS).unwrap().len(), 1);

        let err = read_from(csv.as_bytes(), WEBSITE_LOOKUP_COLUMNS).unwrap_err();
        assert!(err.to_string().contains("'locality'"));
    }

    #[test]
    fn missing_column_error_names_the_file() {
        let path = std::env::temp_dir().join("lead_finder_table_without_name.csv");
        fs::write(&path, "company\nSmith CPA\n").unwrap();

        let err = read_businesses(&path, REQUIRED_COLUMNS).unwrap_err();
        let message = format!("{err:#}");
        fs::remove_file(&path).ok();

        assert!(message.contains("lead_finder_table_without_name.csv"));
        assert!(message.contains("'name'"));
    }
}
