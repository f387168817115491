//! Default values for the run, overridable from the command line.

/// Remote CSV weather log.
pub const URL: &str = "http://www.fifeweather.co.uk/cowdenbeath/200606.csv";

/// Data rows per chunk.
pub const CHUNK_SIZE: usize = 1024;

pub const OUTPUT_DIR: &str = "./output";
pub const T1_FILE_NAME: &str = "task1";
pub const T2_FILE_NAME: &str = "task2";
pub const T3_FILE_NAME: &str = "task3";
pub const FILE_EXTENSION: &str = "txt";
pub const CHECKPOINT_EXTENSION: &str = "json";

/// Date and time formats used by the source and the reports
pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIME_FORMAT: &str = "%H:%M";
pub const MONTH_FORMAT: &str = "%m/%Y";
/// Time format used in the serialized Task 1 state
pub const CHECKPOINT_TIME_FORMAT: &str = "%H:%M:%S";

pub const DATE_COL_NAME: &str = "Date";
pub const TIME_COL_NAME: &str = "Time";

// Task 1
pub const T1_COL_NAME: &str = "Outside Temperature";
pub const T1_TOP_COUNT: usize = 10;

// Task 2
pub const T2_START_DATE: &str = "01/06/2006";
pub const T2_END_DATE: &str = "09/06/2006";
/// Column name, range start, range end (both inclusive)
pub const T2_COL_VALUE_RANGES: &[&str] = &["Hi Temperature:21.3:23.3", "Low Temperature:10.1:10.5"];

// Task 3
pub const T3_COL_NAME: &str = "Outside Temperature";
pub const T3_START_DATE: &str = "01/06/2006";
pub const T3_NUM_DAYS: u32 = 9;
pub const T3_AVERAGE_TEMP: f64 = 25.0;
