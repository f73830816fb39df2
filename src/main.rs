mod gateway;
mod terminal;

use anyhow::Context as _;
use engine::{
    gateway::{APPLICATION_JSON, APPLICATION_PDF},
    Config, Document, Importer, State,
};
use gateway::{DocumentGateway, GeminiGateway};
use history::History;
use model::clock::is_running_low;
use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};
use terminal::Command;
use tokio::{
    fs,
    io::{self, AsyncBufReadExt as _, BufReader},
    runtime::Runtime,
};

/// Largest document accepted for import.
const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

fn document_mime(path: &Path) -> anyhow::Result<&'static str> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    if extension.eq_ignore_ascii_case("pdf") {
        Ok(APPLICATION_PDF)
    } else if extension.eq_ignore_ascii_case("json") {
        Ok(APPLICATION_JSON)
    } else {
        anyhow::bail!("only PDF documents (or pre-extracted JSON payloads) can be imported")
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parse arguments and environment variables
    let path: PathBuf = env::args_os().nth(1).context("usage: mockexam <exam.pdf | exam.json>")?.into();
    let mime = document_mime(&path)?;
    let duration = match env::var("EXAM_DURATION") {
        Ok(duration) => duration.parse().context("EXAM_DURATION must be a number of seconds")?,
        _ => Config::DEFAULT_DURATION_SECS,
    };
    let gemini = match env::var("GEMINI_API_KEY") {
        Ok(key) => {
            let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| String::from(DEFAULT_MODEL));
            Some(GeminiGateway::new(&key, &model)?)
        }
        _ => None,
    };
    let history = env::var_os("HISTORY_PATH").map(PathBuf::from);

    let runtime = Runtime::new()?;
    runtime.block_on(run(path, mime, Config::with_duration(duration), DocumentGateway::new(gemini), history))
}

async fn run(
    path: PathBuf,
    mime: &'static str,
    config: Config,
    gateway: DocumentGateway,
    history: Option<PathBuf>,
) -> anyhow::Result<()> {
    let size = fs::metadata(&path).await?.len();
    anyhow::ensure!(size <= MAX_DOCUMENT_BYTES, "the document is larger than 10 MB");
    let bytes = fs::read(&path).await?;
    let name = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();

    let history = Arc::new(match history {
        Some(path) => History::open(path).await?,
        None => History::in_memory(),
    });
    let importer = Importer::new(gateway, Arc::clone(&history), config);

    println!("{}", engine::Stage::Uploading);
    importer.begin_import(Document::new(name, mime, bytes)).await?;

    let snap = importer.snapshot();
    if let Some(questions) = snap.questions.as_deref() {
        print!("{}", terminal::render_questions(questions));
    }
    println!("\n{}", terminal::render_status(&snap));
    println!("{}", terminal::HELP);

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut updates = importer.subscribe();
    let mut warned = false;
    loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                importer.discard();
                println!("Exam abandoned.");
                return Ok(());
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = updates.borrow_and_update().clone();
                if snap.state == State::Finished {
                    break;
                }
                if !warned && is_running_low(snap.remaining) {
                    warned = true;
                    println!("{}", terminal::render_status(&snap));
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // Input closed: hand the exam in as it stands.
                    importer.submit();
                    break;
                };
                match Command::parse(&line) {
                    Some(Command::Answer { number, key }) => {
                        let snap = importer.snapshot();
                        match snap.questions.as_deref().and_then(|questions| questions.find(number)) {
                            Some(question) => importer.answer(number, terminal::resolve_key(question, key)),
                            None => println!("There is no question {number}."),
                        }
                    }
                    Some(Command::Status) => println!("{}", terminal::render_status(&importer.snapshot())),
                    Some(Command::Submit) => {
                        importer.submit();
                        break;
                    }
                    Some(Command::Help) | None => println!("{}", terminal::HELP),
                }
            }
        }
    }

    let result = importer.finished().await.context("the exam ended without a result")?;
    print!("{}", terminal::render_result(&result));

    match importer.stored().await {
        Some(true) => log::info!("History now holds {} exams.", history.len().await),
        _ => log::warn!("Result {} was not saved to the history.", result.id),
    }
    Ok(())
}
