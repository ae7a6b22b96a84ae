use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Commands {
    /// Copy a source query's result into a destination table
    Run(RunArgs),

    /// Print today's latest step code logged for a table (0 if none)
    Status {
        #[arg(long, help = "Destination table name")]
        table: String,
    },

    /// Open a named connection and run `SELECT 1` on it
    TestConn {
        #[arg(long, help = "Logical connection name from the config file")]
        name: String,
    },

    /// Run a standalone SQL script on a named connection
    Exec {
        #[arg(long, help = "Logical connection name from the config file")]
        name: String,

        #[arg(long, conflicts_with = "sql_file", required_unless_present = "sql_file")]
        sql: Option<String>,

        #[arg(long, help = "File holding the script")]
        sql_file: Option<String>,
    },
}

#[derive(Args)]
pub struct RunArgs {
    #[arg(long, help = "Source connection name")]
    pub source: String,

    #[arg(long, help = "Destination connection name")]
    pub destination: String,

    #[arg(long, help = "Destination table name, without schema")]
    pub table: String,

    #[arg(long, conflicts_with = "query_file", required_unless_present = "query_file")]
    pub query: Option<String>,

    #[arg(long, help = "File holding the source query")]
    pub query_file: Option<String>,

    #[arg(
        long,
        help = "Destination schema, overrides the settings file (default dbo, created if missing)"
    )]
    pub schema: Option<String>,

    #[arg(long, help = "Statement run on the destination before loading")]
    pub pre_delete: Option<String>,

    #[arg(long, help = "Statement run on the destination after every chunk landed")]
    pub post_load: Option<String>,

    #[arg(long, help = "Do not write lifecycle events to the audit table")]
    pub no_log: bool,

    #[arg(long, help = "Load the whole result in one pass instead of chunks")]
    pub single_shot: bool,
}
