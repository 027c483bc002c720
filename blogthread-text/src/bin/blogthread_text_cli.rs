use blogthread_text::{DEFAULT_MAX_LENGTH, Segment, chunk::Chunker, markdown::clean};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};

/// A CLI tool to preview how a Markdown article splits into status segments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input Markdown file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Maximum length of each segment, in characters.
    #[arg(short, long, default_value_t = DEFAULT_MAX_LENGTH)]
    max_length: usize,

    /// Print the normalized plain text instead of the segments.
    #[arg(long)]
    plain: bool,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let body = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let cleaned = clean(&body);
    if args.plain {
        println!("{}", cleaned.text);
        return Ok(());
    }

    let segments = Chunker::new(args.max_length).chunk(&cleaned.text, &cleaned.images);

    #[derive(Serialize)]
    struct SerializableSegment<'a> {
        sequence: usize,
        length: usize,
        text: &'a str,
        images: &'a [String],
    }

    let serializable_segments: Vec<SerializableSegment> = segments
        .iter()
        .enumerate()
        .map(|(sequence, Segment { text, images })| SerializableSegment {
            sequence,
            length: text.chars().count(),
            text,
            images,
        })
        .collect();

    let json_output = serde_json::to_string_pretty(&serializable_segments)?;
    println!("{}", json_output);

    Ok(())
}
