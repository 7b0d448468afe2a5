use std::path::PathBuf;

use clap::{Parser, Subcommand};

use tap_cli::commands::dict_ops;

#[derive(Parser)]
#[command(name = "dictool", about = "Tapdict dictionary maintenance tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty updatable dictionary
    Create {
        /// Output file
        dict_file: PathBuf,
        /// Locale tag stored in the header
        #[arg(long, default_value = "en")]
        locale: String,
        /// Use the decaying format (forgetting-curve history on terminals)
        #[arg(long)]
        decaying: bool,
    },
    /// Show header, counts and attributes
    Info {
        /// Dictionary file
        dict_file: PathBuf,
    },
    /// Look up a word with its shortcuts and bigrams
    Lookup {
        /// Dictionary file
        dict_file: PathBuf,
        /// Word to look up
        word: String,
    },
    /// Add a word or update its probability
    AddWord {
        /// Dictionary file
        dict_file: PathBuf,
        /// Word to add
        word: String,
        /// Probability (0..=255)
        probability: i32,
        /// Shortcut/bigram anchor only, never suggested itself
        #[arg(long)]
        not_a_word: bool,
        /// Recognized but never offered
        #[arg(long)]
        blacklisted: bool,
    },
    /// Add a bigram between two existing words
    AddBigram {
        /// Dictionary file
        dict_file: PathBuf,
        /// Previous word
        prev: String,
        /// Next word
        next: String,
        /// Bigram strength (0..=15)
        probability: i32,
    },
    /// Remove a bigram
    RemoveBigram {
        /// Dictionary file
        dict_file: PathBuf,
        /// Previous word
        prev: String,
        /// Next word
        next: String,
    },
    /// Decode suggestions for typed input on a QWERTY layout
    Suggest {
        /// Dictionary file
        dict_file: PathBuf,
        /// Typed characters
        input: String,
        /// Additional dictionaries merged into the results
        #[arg(long = "extra-dict")]
        extra_dicts: Vec<PathBuf>,
        /// Previous word context
        #[arg(long)]
        prev: Option<String>,
        /// Number of results
        #[arg(short, long, default_value = "10")]
        n: usize,
    },
    /// Predict next words from the previous word's bigrams
    Predict {
        /// Dictionary file
        dict_file: PathBuf,
        /// Previous word
        prev: String,
        /// Restrict to candidates starting with this letter
        #[arg(long)]
        first_letter: Option<char>,
        /// Number of results
        #[arg(short, long, default_value = "10")]
        n: usize,
    },
    /// Garbage-collect into a compact image
    Gc {
        /// Dictionary file
        dict_file: PathBuf,
        /// Output file (defaults to rewriting in place)
        output: Option<PathBuf>,
    },
    /// Import `word<TAB>probability` lines
    Import {
        /// Dictionary file
        dict_file: PathBuf,
        /// Word list file
        word_list: PathBuf,
    },
    /// Export every word as `word<TAB>probability` lines
    Export {
        /// Dictionary file
        dict_file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Command::Create {
            dict_file,
            locale,
            decaying,
        } => dict_ops::create(&dict_file, &locale, decaying),
        Command::Info { dict_file } => dict_ops::info(&dict_file),
        Command::Lookup { dict_file, word } => dict_ops::lookup(&dict_file, &word),
        Command::AddWord {
            dict_file,
            word,
            probability,
            not_a_word,
            blacklisted,
        } => dict_ops::add_word(&dict_file, &word, probability, not_a_word, blacklisted),
        Command::AddBigram {
            dict_file,
            prev,
            next,
            probability,
        } => dict_ops::add_bigram(&dict_file, &prev, &next, probability),
        Command::RemoveBigram {
            dict_file,
            prev,
            next,
        } => dict_ops::remove_bigram(&dict_file, &prev, &next),
        Command::Suggest {
            dict_file,
            input,
            extra_dicts,
            prev,
            n,
        } => dict_ops::suggest(&dict_file, &extra_dicts, &input, prev.as_deref(), n),
        Command::Predict {
            dict_file,
            prev,
            first_letter,
            n,
        } => dict_ops::predict(&dict_file, &prev, first_letter, n),
        Command::Gc { dict_file, output } => {
            let output = output.unwrap_or_else(|| dict_file.clone());
            dict_ops::gc(&dict_file, &output)
        }
        Command::Import {
            dict_file,
            word_list,
        } => dict_ops::import(&dict_file, &word_list),
        Command::Export { dict_file } => dict_ops::export(&dict_file),
    }
}
