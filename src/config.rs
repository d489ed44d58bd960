// src/config.rs

use std::path::PathBuf;

/// Column both inputs are joined on.
pub const ID_COLUMN: &str = "id";
/// Composite column holding `name-value;name-value;...`.
pub const CATEGORIES_COLUMN: &str = "categories";
/// Separates one category entry from the next.
pub const SEGMENT_SEPARATOR: char = ';';
/// Separates a category name from its indicator value.
pub const VALUE_SEPARATOR: char = '-';

/// Printed when the binary is called with the wrong number of arguments.
pub const USAGE: &str = "Please provide the filepaths of the messages and categories \
datasets as the first and second argument respectively, as well as the filepath \
of the database to save the cleaned data to as the third argument. \n\n\
Example: disaster_etl disaster_messages.csv disaster_categories.csv DisasterResponse.db";

/// Everything one pipeline run needs, taken from the three positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub messages_path: PathBuf,
    pub categories_path: PathBuf,
    pub database_path: PathBuf,
    /// The output table is named after the database argument as given.
    pub table_name: String,
}

impl PipelineConfig {
    /// Build from the arguments *after* the program name.
    /// Returns `None` unless there are exactly three.
    pub fn from_args<I, S>(args: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        match <[String; 3]>::try_from(args) {
            Ok([messages, categories, database]) => Some(Self {
                messages_path: PathBuf::from(messages),
                categories_path: PathBuf::from(categories),
                table_name: database.clone(),
                database_path: PathBuf::from(database),
            }),
            Err(_) => None,
        }
    }
}
