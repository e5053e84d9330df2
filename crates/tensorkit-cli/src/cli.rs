use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "tensorkit",
    version,
    about = "Coerce JSON into tensors and find tensors in nested containers"
)]
pub struct Cli {
    /// Log filter, used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Convert a JSON value into a tensor
    Convert {
        /// JSON text, `@path` to read a file, or `-` for stdin
        input: String,

        /// Requested dtype (numeric, any, float32, int32, bool or string)
        #[arg(long, default_value = "numeric")]
        dtype: String,

        /// Argument name reported in errors
        #[arg(long, default_value = "x")]
        arg_name: String,

        /// Function name reported in errors
        #[arg(long, default_value = "convert")]
        fn_name: String,

        /// Trust the first-element shape of nested arrays
        #[arg(long)]
        no_shape_check: bool,
    },

    /// List the tensors reachable from a JSON container
    Walk {
        /// JSON text, `@path` to read a file, or `-` for stdin
        input: String,
    },
}
