//! Workbooks written for follow-up by a person: unmapped requesters and
//! blank mapping templates

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, Worksheet};

const UNMAPPED_ACTION: &str = "Add to email mapping file or verify username";

/// Column indices for the unmapped users report
mod unmapped_cols {
    pub const USERNAME: u16 = 0;
    pub const STATUS: u16 = 1;
    pub const MODE: u16 = 2;
    pub const TIMESTAMP: u16 = 3;
    pub const ACTION: u16 = 4;
}

/// Column indices for the mapping template (must match the resolver's reader)
mod mapping_cols {
    pub const USERNAME: u16 = 0;
    pub const EMAIL: u16 = 1;
    pub const STATUS: u16 = 2;
}

/// `unmapped_users_<mode>_<YYYYmmdd_HHMMSS>.xlsx`
pub fn unmapped_users_filename(mode: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "unmapped_users_{}_{}.xlsx",
        mode,
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

/// Write the requesters that had no email address
pub fn write_unmapped_users(
    path: &Path,
    users: &[String],
    mode: &str,
    timestamp: NaiveDateTime,
) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Unmapped Users")?;

    write_header(
        worksheet,
        &[
            (unmapped_cols::USERNAME, "Username"),
            (unmapped_cols::STATUS, "Status"),
            (unmapped_cols::MODE, "Mode"),
            (unmapped_cols::TIMESTAMP, "Timestamp"),
            (unmapped_cols::ACTION, "Recommended_Action"),
        ],
    )?;

    let stamp = timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
    for (i, user) in users.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, unmapped_cols::USERNAME, user)?;
        worksheet.write_string(row, unmapped_cols::STATUS, "Email Not Found")?;
        worksheet.write_string(row, unmapped_cols::MODE, mode)?;
        worksheet.write_string(row, unmapped_cols::TIMESTAMP, &stamp)?;
        worksheet.write_string(row, unmapped_cols::ACTION, UNMAPPED_ACTION)?;
    }
    worksheet.set_column_width(unmapped_cols::ACTION, 45)?;

    workbook
        .save(path)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;

    log::info!(
        "Exported {} unmapped users to {}",
        users.len(),
        path.display()
    );
    Ok(())
}

/// Write a mapping template with one row per requester and an empty Email
/// column to fill in
pub fn write_mapping_template(path: &Path, users: &[String]) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Email Mapping")?;

    write_header(
        worksheet,
        &[
            (mapping_cols::USERNAME, "Username"),
            (mapping_cols::EMAIL, "Email"),
            (mapping_cols::STATUS, "Status"),
        ],
    )?;

    for (i, user) in users.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, mapping_cols::USERNAME, user)?;
        worksheet.write_string(row, mapping_cols::STATUS, "NEEDS_EMAIL")?;
    }
    worksheet.set_column_width(mapping_cols::EMAIL, 35)?;

    workbook
        .save(path)
        .with_context(|| format!("Failed to save Excel file: {}", path.display()))?;
    Ok(())
}

fn write_header(ws: &mut Worksheet, columns: &[(u16, &str)]) -> Result<()> {
    let bold = Format::new().set_bold();
    for (col, name) in columns {
        ws.write_string_with_format(0, *col, *name, &bold)?;
        ws.set_column_width(*col, 20)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Reader, Xlsx, open_workbook};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 11)
            .unwrap()
            .and_hms_opt(12, 13, 56)
            .unwrap()
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
        let name = workbook.sheet_names()[0].clone();
        let range = workbook.worksheet_range(&name).unwrap();
        range
            .rows()
            .map(|r| {
                r.iter()
                    .map(|c| match c {
                        Data::String(s) => s.clone(),
                        _ => String::new(),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_filename() {
        assert_eq!(
            unmapped_users_filename("demo", timestamp()),
            "unmapped_users_demo_20250911_121356.xlsx"
        );
    }

    #[test]
    fn test_write_unmapped_users() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("unmapped.xlsx");
        let users = vec!["JSMITH".to_string(), "ADOE".to_string()];

        write_unmapped_users(&path, &users, "live", timestamp()).unwrap();

        let rows = read_rows(&path);
        assert_eq!(
            rows[0],
            vec!["Username", "Status", "Mode", "Timestamp", "Recommended_Action"]
        );
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], "JSMITH");
        assert_eq!(rows[1][1], "Email Not Found");
        assert_eq!(rows[2][2], "live");
        assert_eq!(rows[2][3], "2025-09-11 12:13:56");
    }

    #[test]
    fn test_write_mapping_template() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mapping.xlsx");
        let users = vec!["ADOE".to_string(), "JSMITH".to_string()];

        write_mapping_template(&path, &users).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[0], vec!["Username", "Email", "Status"]);
        assert_eq!(rows[1], vec!["ADOE", "", "NEEDS_EMAIL"]);
        assert_eq!(rows[2][0], "JSMITH");
    }
}
