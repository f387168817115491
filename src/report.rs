//! Writes the finalized task results as plain text reports.

use std::{
    fmt::Display,
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use tracing::{error, info};

use crate::{
    config::FILE_EXTENSION,
    error::{Result, WeatherError},
    tasks::HottestSummary,
};

const MONTHLY_HEADING: &str = "Average time of hottest daily temperature (over month)";
const MOST_COMMON_HEADING: &str = "Most commonly occurring hottest time of day";

#[derive(Debug, Clone, PartialEq)]
/// Output directory and the base names of the three task files.
pub struct OutputFiles {
    pub dir: PathBuf,
    pub task1: String,
    pub task2: String,
    pub task3: String,
}

impl OutputFiles {
    /// Creates the output directory if needed.
    pub fn ensure_dir(&self) -> Result<()> {
        if self.dir.exists() && !self.dir.is_dir() {
            let e = WeatherError::NotADirectory(self.dir.clone());
            error!("{}", e);
            return Err(e);
        }
        fs::create_dir_all(&self.dir).map_err(|e| {
            error!("Could not create `{}`: {}", self.dir.display(), e);
            WeatherError::file_write(&self.dir, e)
        })
    }

    pub fn report_path(&self, base: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", base, FILE_EXTENSION))
    }
}

/// A report file written line by line.
pub struct ReportFile {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: usize,
}

impl ReportFile {
    /// Creates or truncates the file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| write_error(path, e))?;
        Ok(ReportFile {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn write_line(&mut self, line: impl Display) -> Result<()> {
        writeln!(self.writer, "{}", line).map_err(|e| write_error(&self.path, e))?;
        self.lines += 1;
        Ok(())
    }

    pub fn write_lines<I>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Display,
    {
        for line in lines {
            self.write_line(line)?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .map_err(|e| write_error(&self.path, e))?;
        info!("Wrote {} lines to `{}`", self.lines, self.path.display());
        Ok(self.lines)
    }
}

fn write_error(path: &Path, e: std::io::Error) -> WeatherError {
    error!("Error while writing `{}`: {}", path.display(), e);
    WeatherError::file_write(path, e)
}

/// Writes the three parts of the Task 1 report.
pub fn save_hottest(summary: &HottestSummary, top_count: usize, path: &Path) -> Result<()> {
    let mut file = ReportFile::create(path)?;

    file.write_line(MONTHLY_HEADING)?;
    file.write_lines(summary.monthly.iter().map(|(m, t)| format!("{} {}", m, t)))?;

    file.write_line("")?;
    file.write_line(MOST_COMMON_HEADING)?;
    file.write_line(summary.most_common.as_deref().unwrap_or_default())?;

    file.write_line("")?;
    file.write_line(format!("Top {} hottest times on distinct days", top_count))?;
    file.write_lines(summary.top.iter().map(|(t, d)| format!("{} {}", t, d)))?;

    file.finish()?;
    Ok(())
}

/// Writes one entry per line.
pub fn save_lines<I>(lines: I, path: &Path) -> Result<usize>
where
    I: IntoIterator,
    I::Item: Display,
{
    let mut file = ReportFile::create(path)?;
    file.write_lines(lines)?;
    file.finish()
}

// -- Tests -------------------------------------------------------------------
