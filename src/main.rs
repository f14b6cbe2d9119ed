use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use glo_annotate::labels::{read_labels, Label, LabelError};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "glo-annotate", about = "Compile .glo glow-club scripts", version)]
struct Cli {
    /// Audacity project file providing the label track
    #[arg(long)]
    audacity: Option<PathBuf>,

    /// Club to specialize for (0 = no specialization)
    #[arg(long, default_value_t = 0)]
    club: i64,

    /// Input file, `-` for standard input
    #[arg(long, default_value = "-")]
    input: String,

    /// Output file, `-` for standard output
    #[arg(long, default_value = "-")]
    output: String,

    /// Synthesize the program from the label timeline instead of compiling
    /// the input directly
    #[arg(long)]
    timeline: bool,
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn load_labels(path: &PathBuf) -> Vec<Label> {
    match read_labels(path) {
        Ok(labels) => labels,
        Err(LabelError::Io(e)) => fail(format!(
            "Error: Can't open audacity file `{}`: {e}",
            path.display()
        )),
        Err(e) => fail(format!(
            "Error reading Audacity file `{}`: {e}",
            path.display()
        )),
    }
}

fn read_source(input: &str) -> io::Result<String> {
    if input == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        fs::read_to_string(input)
    }
}

fn write_output(output: &str, text: &str) -> io::Result<()> {
    if output == "-" {
        io::stdout().write_all(text.as_bytes())
    } else {
        fs::write(output, text)
    }
}

fn main() {
    let cli = Cli::parse();
    if cli.club < 0 {
        fail("Error: Club can't be negative");
    }
    let labels = cli.audacity.as_ref().map_or_else(Vec::new, load_labels);
    let source = match read_source(&cli.input) {
        Ok(source) => source,
        Err(e) => fail(format!("Error opening input file `{}`: {e}", cli.input)),
    };
    let annotated = match glo_annotate::compile(&source, labels, cli.timeline, cli.club) {
        Ok(annotated) => annotated,
        Err(e) => fail(e),
    };
    if let Err(e) = write_output(&cli.output, &annotated) {
        fail(format!("Error opening output file `{}`: {e}", cli.output));
    }
}
