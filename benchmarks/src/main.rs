use anyhow::anyhow;
use clap::Parser;
use const_format::concatcp;
use rand::Rng;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;
use std::fs::File;
use std::ops::AddAssign;
use std::process::{self, Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const LOCAL_PORT: u32 = 8374;
const LOCAL_URL: &str = concatcp!("http://127.0.0.1:", LOCAL_PORT, "/api/v1");

#[rustfmt::skip]
const ANSWERS: &[&str] = &[
    "Alpha",
    "Bravo",
    "Charlie",
    "Delta",
    "Echo",
    "Foxtrot",
    "Golf",
    "Hotel",
];

#[derive(Parser)]
struct Args {
    /// Silence local server logging.
    #[arg(short, long)]
    quiet: bool,

    /// Send local server logging to this file; takes precedence over --quiet.
    #[arg(long)]
    logfile: Option<String>,

    /// Connect to a remote server at this URL (including the API prefix)
    /// instead of running a local one.
    #[arg(long)]
    remote: Option<String>,

    /// How many threads to use. Defaults to the number of logical CPUs.
    #[arg(long, default_value_t = num_cpus::get())]
    threads: usize,

    /// How many edits each thread submits.
    #[arg(long, default_value_t = 100)]
    rounds: usize,

    /// Check that the question ends up with exactly one submitted option set.
    #[arg(long)]
    verify: bool,
}

/// Construct a URL from segments.
macro_rules! url {
    ($base:expr $(, $segment:expr)*) => {{
        let mut url = String::from($base);
        $(
            url.push('/');
            url.push_str(&$segment.to_string());
        )*
        url
    }}
}

/// Terminate the given child process. This is a SIGTERM on unix and a hard-kill on other
/// platforms.
fn terminate_child(child: &mut Child) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let pid = nix::unistd::Pid::from_raw(child.id() as i32);
        nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM)?;
    }
    #[cfg(not(unix))]
    {
        child.kill()?;
    }
    Ok(())
}

/// Build the server and start it against the database in `ROCKET_DB_URI`.
fn launch_server(logfile: Stdio) -> anyhow::Result<Child> {
    env::var("ROCKET_DB_URI")
        .map_err(|_| anyhow!("ROCKET_DB_URI must point at a replica set"))?;

    Command::new("cargo")
        .args(["build", "--release", "--bin", "question-bank"])
        .status()?
        .success()
        .then_some(())
        .ok_or_else(|| anyhow!("server build exited nonzero"))?;

    let mut proc = Command::new("./target/release/question-bank")
        .env("ROCKET_PORT", LOCAL_PORT.to_string())
        .stdout(logfile)
        .spawn()?;

    // Wait for the server to be reachable.
    let client = Client::new();
    loop {
        let resp = client
            .get(url!(LOCAL_URL, "questions"))
            .send()
            .and_then(Response::error_for_status);

        if resp.is_ok() {
            break;
        }

        // Check the server didn't exit.
        if let Some(retcode) = proc.try_wait()? {
            return Err(anyhow!("Server exited prematurely with code {}", retcode));
        }
        thread::sleep(Duration::from_millis(100));
    }

    Ok(proc)
}

/// How many options edit `round` of thread `thread` submits.
fn option_count(thread: usize, round: usize) -> usize {
    1 + (thread + round) % ANSWERS.len()
}

/// Recover the thread and round from an option tag such as `t3 r17`.
fn parse_tag(tag: &str) -> Option<(usize, usize)> {
    let (thread, round) = tag.split_once(' ')?;
    let thread = thread.strip_prefix('t')?.parse().ok()?;
    let round = round.strip_prefix('r')?.parse().ok()?;
    Some((thread, round))
}

/// The option set submitted by edit `round` of thread `thread`.
fn option_set(thread: usize, round: usize) -> Vec<Value> {
    let len = option_count(thread, round);
    let correct = rand::thread_rng().gen_range(0..len);
    ANSWERS
        .iter()
        .take(len)
        .enumerate()
        .map(|(i, answer)| {
            json!({
                "text": format!("{answer} t{thread} r{round}"),
                "is_correct": i == correct,
            })
        })
        .collect()
}

/// Create a question to benchmark against and return its ID.
fn setup_question(url: &str) -> anyhow::Result<u64> {
    #[derive(Deserialize)]
    struct Created {
        id: u64,
    }

    let client = Client::new();
    let created: Created = client
        .post(url!(url, "questions"))
        .json(&json!({
            "question_text": "Which edit wins?",
            "options": option_set(0, 0),
        }))
        .send()
        .and_then(Response::error_for_status)?
        .json()?;

    Ok(created.id)
}

#[derive(Default)]
struct EditStats {
    succeeded: u32,
    conflicted: u32,
    total: Duration,
}

impl AddAssign for EditStats {
    fn add_assign(&mut self, rhs: Self) {
        self.succeeded += rhs.succeeded;
        self.conflicted += rhs.conflicted;
        self.total += rhs.total;
    }
}

/// Submit one edit and record how it went. Concurrent edits of the same
/// question can lose a write conflict, which the server reports as a 500.
fn edit(client: &Client, url: &str, id: u64, thread: usize, round: usize) -> anyhow::Result<EditStats> {
    let start = Instant::now();
    let resp = client
        .put(url!(url, "questions", id))
        .json(&json!({
            "question_text": format!("Which edit wins? (t{thread} r{round})"),
            "options": option_set(thread, round),
        }))
        .send()?;
    let elapsed = start.elapsed();

    let mut stats = EditStats {
        total: elapsed,
        ..Default::default()
    };
    match resp.status() {
        StatusCode::OK => stats.succeeded += 1,
        StatusCode::INTERNAL_SERVER_ERROR => stats.conflicted += 1,
        status => return Err(anyhow!("unexpected edit status {}: {}", status, resp.text()?)),
    }
    Ok(stats)
}

/// Run the benchmark.
fn benchmark(url: &str, id: u64, num_threads: usize, rounds: usize) -> anyhow::Result<()> {
    let start = Instant::now();
    thread::scope(|s| {
        let threads = (0..num_threads)
            .map(|thread| {
                s.spawn(move || {
                    let client = Client::new();
                    let mut stats = EditStats::default();
                    for round in 0..rounds {
                        stats += edit(&client, url, id, thread, round)?;
                    }
                    Ok::<_, anyhow::Error>(stats)
                })
            })
            .collect::<Vec<_>>();

        let mut stats = EditStats::default();
        for t in threads {
            stats += t.join().map_err(|_| anyhow!("thread panicked"))??;
        }
        let total_duration = start.elapsed();

        let attempts = stats.succeeded + stats.conflicted;
        let avg_duration = stats.total / attempts.max(1);
        let actual_edits_per_sec = attempts as f64 / total_duration.as_secs_f64();

        println!("edit: {:?}", avg_duration);
        println!(
            "outcome: {} succeeded, {} conflicted ({:.1}%)",
            stats.succeeded,
            stats.conflicted,
            100.0 * stats.conflicted as f64 / attempts.max(1) as f64
        );
        println!(
            "actual duration: {} edits in {:?} ({:.2}/s)",
            attempts, total_duration, actual_edits_per_sec
        );

        Ok(())
    })
}

/// Return `Ok(())` if the question's options are exactly one of the submitted sets.
fn verify(url: &str, id: u64) -> anyhow::Result<()> {
    #[derive(Deserialize)]
    struct Answer {
        text: String,
    }

    #[derive(Deserialize)]
    struct Question {
        options: Vec<Answer>,
    }

    let client = Client::new();
    let question: Question = client
        .get(url!(url, "questions", id))
        .send()
        .and_then(Response::error_for_status)?
        .json()?;

    let texts = question
        .options
        .iter()
        .map(|o| o.text.as_str())
        .collect::<Vec<_>>();
    let tag = check_options(&texts)?;
    println!("verified: {} options from edit {}", texts.len(), tag);
    Ok(())
}

/// Check the stored option texts are exactly one submitted set, in order, and
/// return the tag of the edit that wrote them.
fn check_options<'a>(texts: &[&'a str]) -> anyhow::Result<&'a str> {
    let Some(first) = texts.first() else {
        return Err(anyhow!("question has no options"));
    };

    // Every option text carries the thread and round of the edit that wrote it.
    let tag = first
        .split_once(' ')
        .map(|(_, tag)| tag)
        .ok_or_else(|| anyhow!("unrecognised option text {:?}", first))?;
    if texts.iter().any(|t| t.split_once(' ').map(|(_, t)| t) != Some(tag)) {
        return Err(anyhow!("options were interleaved: {:?}", texts));
    }

    let (thread, round) =
        parse_tag(tag).ok_or_else(|| anyhow!("unrecognised option tag {:?}", tag))?;
    let expected = option_count(thread, round);
    if texts.len() != expected {
        return Err(anyhow!(
            "edit {} submitted {} options but {} are stored: {:?}",
            tag,
            expected,
            texts.len(),
            texts
        ));
    }

    // The texts were submitted in ANSWERS order.
    for (text, answer) in texts.iter().zip(ANSWERS) {
        if !text.starts_with(answer) {
            return Err(anyhow!("options out of order: {:?}", texts));
        }
    }

    Ok(tag)
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let url = args.remote.as_deref().unwrap_or(LOCAL_URL);

    // If we're not connecting remotely, bring up a local server.
    let mut proc: Option<Child> = None;
    if args.remote.is_none() {
        let logfile = match args.logfile {
            Some(path) => Stdio::from(File::create(path)?),
            None => {
                if args.quiet {
                    Stdio::null()
                } else {
                    Stdio::inherit()
                }
            }
        };
        proc = Some(launch_server(logfile)?);
    }

    // Use a closure to ensure the cleanup below runs.
    let result = (|| {
        let id = setup_question(url)?;
        benchmark(url, id, args.threads, args.rounds)?;

        if args.verify {
            verify(url, id)?;
        }

        Ok(())
    })();

    // Kill the server.
    if let Some(p) = proc.as_mut() {
        terminate_child(p)?;
        p.wait()?;
    }

    result
}

fn main() {
    if let Err(e) = run() {
        eprintln!("FATAL: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(thread: usize, round: usize) -> Vec<String> {
        option_set(thread, round)
            .iter()
            .map(|o| o["text"].as_str().unwrap().to_string())
            .collect()
    }

    fn passes(texts: &[String]) -> bool {
        let texts = texts.iter().map(String::as_str).collect::<Vec<_>>();
        check_options(&texts).is_ok()
    }

    #[test]
    fn tags_round_trip() {
        assert_eq!(parse_tag("t3 r17"), Some((3, 17)));
        assert_eq!(parse_tag("3 17"), None);
        assert_eq!(parse_tag("t3"), None);
    }

    #[test]
    fn complete_set_passes() {
        let submitted = texts(2, 1);
        assert_eq!(submitted.len(), 4);
        assert!(passes(&submitted));
    }

    #[test]
    fn truncated_set_fails() {
        let mut stored = texts(2, 1);
        stored.truncate(2);
        assert!(!passes(&stored));
    }

    #[test]
    fn mixed_sets_fail() {
        let mut stored = texts(0, 1);
        stored[1] = texts(1, 1)[1].clone();
        assert!(!passes(&stored));
    }

    #[test]
    fn reordered_set_fails() {
        let mut stored = texts(2, 1);
        stored.swap(0, 1);
        assert!(!passes(&stored));
    }

    #[test]
    fn empty_set_fails() {
        assert!(!passes(&[]));
    }
}
