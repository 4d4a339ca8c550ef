use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use jobscope_core::error::AppError;
use jobscope_core::models::SkillCount;
use jobscope_core::traits::ReportSink;

const BAR_WIDTH: u64 = 40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Aligned table with a bar per skill
    #[default]
    Table,
    /// The analysis result as a JSON object
    Json,
    /// `kind,name,count` rows
    Csv,
}

/// Build the sink for `format`, writing to `output` or stdout.
pub fn open_sink(
    format: ReportFormat,
    output: Option<&Path>,
) -> Result<Box<dyn ReportSink>, AppError> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    Ok(match format {
        ReportFormat::Table => Box::new(ConsoleReport::new(writer)),
        ReportFormat::Json => Box::new(JsonReport::new(writer)),
        ReportFormat::Csv => Box::new(CsvReport::new(writer)),
    })
}

/// Human-readable table, skills ranked by count.
pub struct ConsoleReport<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReport<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn write(&mut self, counts: &SkillCount) -> io::Result<()> {
        let ranked = counts.ranked();
        let name_width = ranked
            .iter()
            .map(|(name, _)| name.chars().count())
            .max()
            .unwrap_or(0)
            .max("skill".len());
        let max = ranked.first().map(|(_, n)| *n).unwrap_or(0);

        writeln!(self.out, "{:<name_width$}  {:>6}", "skill", "count")?;
        writeln!(self.out, "{}", "-".repeat(name_width + 8))?;
        for (name, count) in &ranked {
            writeln!(
                self.out,
                "{name:<name_width$}  {count:>6}  {}",
                bar(*count, max)
            )?;
        }

        writeln!(self.out)?;
        for (category, count) in &counts.category_counts {
            writeln!(self.out, "{:<name_width$}  {count:>6}", category.as_str())?;
        }
        self.out.flush()
    }
}

fn bar(count: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let len = (count * BAR_WIDTH).div_ceil(max) as usize;
    "█".repeat(len)
}

impl<W: Write> ReportSink for ConsoleReport<W> {
    fn report(&mut self, counts: &SkillCount) -> Result<(), AppError> {
        Ok(self.write(counts)?)
    }
}

/// Pretty-printed JSON, e.g. `{"python": 1, "category_counts": {"technical": 1}}`.
pub struct JsonReport<W: Write> {
    out: W,
}

impl<W: Write> JsonReport<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ReportSink for JsonReport<W> {
    fn report(&mut self, counts: &SkillCount) -> Result<(), AppError> {
        serde_json::to_writer_pretty(&mut self.out, counts)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// One `skill` row per skill, then one `category` row per category.
pub struct CsvReport<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvReport<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(out),
        }
    }

    fn write(&mut self, counts: &SkillCount) -> csv::Result<()> {
        self.writer.write_record(["kind", "name", "count"])?;
        for (name, count) in &counts.skills {
            self.writer
                .write_record(["skill", name.as_str(), count.to_string().as_str()])?;
        }
        for (category, count) in &counts.category_counts {
            self.writer
                .write_record(["category", category.as_str(), count.to_string().as_str()])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> ReportSink for CsvReport<W> {
    fn report(&mut self, counts: &SkillCount) -> Result<(), AppError> {
        self.write(counts)
            .map_err(|e| AppError::Generic(format!("CSV export failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobscope_core::models::SkillCategory;

    fn sample() -> SkillCount {
        let mut counts = SkillCount::default();
        counts.skills.insert("python".into(), 3);
        counts.skills.insert("sql".into(), 1);
        counts.skills.insert("docker".into(), 0);
        counts.category_counts.insert(SkillCategory::Technical, 4);
        counts.category_counts.insert(SkillCategory::Soft, 0);
        counts
    }

    #[test]
    fn test_console_report_ranks_skills() {
        let mut out = Vec::new();
        ConsoleReport::new(&mut out).report(&sample()).unwrap();
        let text = String::from_utf8(out).unwrap();

        let python = text.find("python").unwrap();
        let sql = text.find("sql").unwrap();
        let docker = text.find("docker").unwrap();
        assert!(python < sql && sql < docker);
        assert!(text.contains("technical"));
        assert!(text.contains(&"█".repeat(40)));
    }

    #[test]
    fn test_console_report_empty_result() {
        let mut out = Vec::new();
        ConsoleReport::new(&mut out)
            .report(&SkillCount::default())
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("skill"));
        assert!(!text.contains('█'));
    }

    #[test]
    fn test_json_report_shape() {
        let mut out = Vec::new();
        JsonReport::new(&mut out).report(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["python"], 3);
        assert_eq!(value["docker"], 0);
        assert_eq!(value["category_counts"]["technical"], 4);
        assert_eq!(value["category_counts"]["soft"], 0);
    }

    #[test]
    fn test_csv_report_rows() {
        let mut out = Vec::new();
        CsvReport::new(&mut out).report(&sample()).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec![
                "kind,name,count",
                "skill,docker,0",
                "skill,python,3",
                "skill,sql,1",
                "category,technical,4",
                "category,soft,0",
            ]
        );
    }

    #[test]
    fn test_bar_scaling() {
        assert_eq!(bar(0, 0), "");
        assert_eq!(bar(10, 10).chars().count(), 40);
        assert_eq!(bar(1, 80).chars().count(), 1);
        assert_eq!(bar(0, 5), "");
    }
}
