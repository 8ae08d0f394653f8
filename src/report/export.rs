use std::io::Write;

use super::cell::Row;

/// Writes report rows as CSV. Rows keep their own width; separator rows become
/// empty lines.
pub fn write_csv<W: Write>(rows: &[Row], mut writer: W) -> Result<(), csv::Error> {
    for row in rows {
        if row.is_empty() {
            writer.write_all(b"\n")?;
            continue;
        }
        let mut line = csv::WriterBuilder::new()
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(&mut writer);
        line.write_record(row.iter().map(|cell| cell.to_string()))?;
        line.flush()?;
    }
    writer.flush()?;
    Ok(())
}

pub fn to_csv_string(rows: &[Row]) -> Result<String, csv::Error> {
    let mut buffer = Vec::new();
    write_csv(rows, &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| {
        csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    })
}
