use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt)]
pub struct Args {
    /// Source file to compile; without one an interactive prompt starts.
    #[structopt(name = "FILE_NAME")]
    pub file_name: Option<PathBuf>,

    /// Directory for dump files; defaults to the input file's directory.
    #[structopt(short, long)]
    pub output: Option<PathBuf>,

    /// Write the token stream to FILE.token.
    #[structopt(short, long)]
    pub token: bool,

    /// Write the syntax tree in Graphviz DOT format to FILE.dot.
    #[structopt(short, long)]
    pub parse: bool,

    /// Write the symbol table to FILE.symbol.
    #[structopt(short, long)]
    pub semantic: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self::new()
    }
}

impl Args {
    pub fn new() -> Self {
        Self::from_args()
    }
}
