use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use net::{HttpEngine, NetworkEngine, Request};
use serde_json::Value;

use trawl::serial::{self, ObjectKind};
use trawl::{
    describe_parsable_content, describe_result, logger, tags_from_results, urls_from_results,
    FileIdentifier, PageParser, ParseRootFileLookup, SimpleJob,
};

#[derive(Parser)]
#[command(name = "trawl", about = "Run declarative page parsing scripts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Describe a persisted parsing script
    Show { script: PathBuf },
    /// Run a page parsing script over a local file or a fetched URL
    Run {
        script: PathBuf,
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
    },
    /// Run a file lookup script for one identifier
    Lookup {
        script: PathBuf,
        /// Hash identifier, in hex
        #[arg(long, conflicts_with_all = ["input", "media"])]
        hash: Option<String>,
        /// Custom user input identifier
        #[arg(long, conflicts_with = "media")]
        input: Option<String>,
        /// Path of a local file to attach
        #[arg(long)]
        media: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    logger::init().ok();
    let cli = Cli::parse();
    match cli.command {
        Command::Show { script } => show(&script),
        Command::Run { script, file, url } => run(&script, file, url),
        Command::Lookup {
            script,
            hash,
            input,
            media,
        } => lookup(&script, hash, input, media),
    }
}

fn load_value(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("could not read script {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("script {} is not valid json", path.display()))
}

fn show(path: &Path) -> Result<()> {
    let value = load_value(path)?;
    match serial::peek_kind(&value)? {
        kind if kind == ObjectKind::PageParser.id() => {
            let parser: PageParser = serial::decode(&value)?;
            println!("page parser: {}", parser.name());
            println!("key: {}", parser.parser_key());
            for url in parser.example_urls() {
                println!("example url: {url}");
            }
            println!(
                "produces: {}",
                describe_parsable_content(&parser.parsable_content(), false)
            );
        }
        kind if kind == ObjectKind::FileLookup.id() => {
            let script: ParseRootFileLookup = serial::decode(&value)?;
            println!(
                "file lookup script: {} ({})",
                script.name(),
                script.query_type().label()
            );
            println!(
                "produces: {}",
                describe_parsable_content(&script.parsable_content(), false)
            );
        }
        other => bail!("script is not a runnable root (object kind {other})"),
    }
    Ok(())
}

fn run(path: &Path, file: Option<PathBuf>, url: Option<String>) -> Result<()> {
    let value = load_value(path)?;
    let parser: PageParser = serial::decode(&value).context("script is not a page parser")?;

    let page_data = match (file, url) {
        (Some(file), None) => fs::read_to_string(&file)
            .with_context(|| format!("could not read page {}", file.display()))?,
        (None, Some(url)) => {
            let engine = HttpEngine::new();
            let mut job = engine.add_job(Request::get(&url));
            job.wait_until_done()
                .with_context(|| format!("could not fetch {url}"))?;
            String::from_utf8_lossy(&job.content()).into_owned()
        }
        _ => bail!("exactly one of --file or --url is required"),
    };

    let (separated, flat) = parser.parse(&page_data)?;

    for (i, group) in separated.iter().enumerate() {
        println!("-- separated item {}", i + 1);
        for result in group {
            println!("{}", describe_result(result));
        }
    }

    let tags = tags_from_results(&flat);
    if !tags.is_empty() {
        println!("-- tags");
        for tag in tags {
            println!("{tag}");
        }
    }
    let url_groups = urls_from_results(&flat);
    if !url_groups.is_empty() {
        println!("-- urls, highest priority first");
        for group in url_groups {
            for url in group {
                println!("{url}");
            }
        }
    }
    Ok(())
}

fn lookup(
    path: &Path,
    hash: Option<String>,
    input: Option<String>,
    media: Option<PathBuf>,
) -> Result<()> {
    let value = load_value(path)?;
    let script: ParseRootFileLookup =
        serial::decode(&value).context("script is not a file lookup")?;

    let identifier = match (hash, input, media) {
        (Some(hash), None, None) => {
            FileIdentifier::Hash(hex::decode(&hash).context("--hash is not valid hex")?)
        }
        (None, Some(input), None) => FileIdentifier::UserInput(input),
        (None, None, Some(media)) => FileIdentifier::File(media),
        _ => bail!("exactly one of --hash, --input, or --media is required"),
    };
    if script.uses_user_input() && !matches!(identifier, FileIdentifier::UserInput(_)) {
        bail!("script \"{}\" takes user input; pass --input", script.name());
    }

    let engine = HttpEngine::new();
    let job = SimpleJob::new();
    let results = script.do_query(&engine, &job, &identifier)?;
    for result in &results {
        println!("{}", describe_result(result));
    }
    if let Some(status) = job.variable("script_status") {
        println!("-- {status}");
    }
    Ok(())
}
