mod input;

use std::{
    env,
    fs::File,
    io::{self, BufWriter},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use coursescrape::{
    courses::{find_course, load_courses},
    report::{self, CourseReport},
    Aggregate, Banner, BannerSession, Catalog, CatalogInfo, CourseIdentifier, Pipeline, Settings,
};
use log::{info, warn, LevelFilter};

#[derive(Parser, Debug)]
#[command(version, about = "Look up course sections in the registration system")]
struct Args {
    /// Show one course, read as SUBJECT NUMBER from the arguments or the first line of stdin
    #[arg(long, conflicts_with_all = ["courses", "all"])]
    course: bool,

    /// Show every SUBJECT NUMBER pair given as arguments
    #[arg(long, conflicts_with = "all")]
    courses: bool,

    /// Fetch every course in the course list and export them as CSV
    #[arg(long)]
    all: bool,

    /// Only fetch the first few courses of the list
    #[arg(long, requires = "all")]
    dry_run: bool,

    /// Term code, overriding the configured one (e.g. 202501)
    #[arg(long)]
    term: Option<String>,

    /// Course list in the catalog's JSON format
    #[arg(long, value_name = "FILE", default_value = "courses.json")]
    input: PathBuf,

    /// CSV file written by --all
    #[arg(long, value_name = "FILE", default_value = "courses.csv")]
    output: PathBuf,

    /// Logging verbosity level (valid values: off, error, warn, info, debug, trace)
    #[arg(short, long, value_name = "LEVEL", default_value = "info")]
    verbosity: LevelFilter,

    #[arg(value_name = "SUBJECT NUMBER")]
    args: Vec<String>,
}

enum Outcome {
    Complete,
    /// Output was written but some courses or sections failed.
    Partial,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbosity);

    if !(args.course || args.courses || args.all) {
        if let Err(e) = Args::command().print_help() {
            eprintln!("error: {e}");
        }
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(Outcome::Complete) => ExitCode::SUCCESS,
        Ok(Outcome::Partial) => ExitCode::from(2),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: LevelFilter) {
    if env::var(env_logger::DEFAULT_FILTER_ENV).is_ok() {
        env_logger::init();
    } else {
        env_logger::builder()
            .filter_level(LevelFilter::Warn)
            .filter_module("coursescrape", verbosity)
            .format_timestamp(None)
            .format_target(false)
            .init();
    }
}

async fn run(args: Args) -> Result<Outcome> {
    let mut settings = Settings::load().context("invalid configuration")?;
    if let Some(term) = &args.term {
        settings.term = term.clone();
    }

    if args.all {
        return export_all(&args, &settings).await;
    }

    let requested = if args.course {
        vec![input::course_from_input(&args.args, io::stdin().lock())?]
    } else {
        input::course_pairs(&args.args)?
    };

    let known = known_courses(&args.input);
    for (subject, number) in requested {
        let course = find_course(&known, &subject, &number)
            .cloned()
            .unwrap_or_else(|| CourseIdentifier::new(subject, number));
        show_course(&settings, &course).await?;
    }

    Ok(Outcome::Complete)
}

async fn show_course(settings: &Settings, course: &CourseIdentifier) -> Result<()> {
    info!("looking up {course} in {}", settings.term);

    let session = BannerSession::new(&Banner::from_settings(settings), &settings.term)
        .await
        .with_context(|| format!("opening session for {course}"))?;
    let sections = coursescrape::course_details(&session, &course.subject, &course.number)
        .await
        .with_context(|| format!("fetching {course}"))?;

    let catalog = match &course.pid {
        Some(pid) => catalog_info(settings, pid).await,
        None => None,
    };

    println!(
        "{}",
        CourseReport {
            course,
            term: &settings.term,
            sections: &sections,
            catalog: catalog.as_ref(),
        }
    );
    Ok(())
}

/// The course list only adds titles and catalog ids here, so a missing or
/// broken file is not fatal.
fn known_courses(path: &Path) -> Vec<CourseIdentifier> {
    if !path.exists() {
        return Vec::new();
    }
    load_courses(path).unwrap_or_else(|e| {
        warn!("{e}");
        Vec::new()
    })
}

async fn catalog_info(settings: &Settings, pid: &str) -> Option<CatalogInfo> {
    let result = match Catalog::from_settings(settings) {
        Ok(catalog) => catalog.fetch(pid).await,
        Err(e) => Err(e),
    };

    result
        .map_err(|e| warn!("catalog lookup for {pid} failed: {e}"))
        .ok()
}

async fn export_all(args: &Args, settings: &Settings) -> Result<Outcome> {
    let mut courses = load_courses(&args.input)?;
    if args.dry_run {
        courses.truncate(settings.dry_run_limit);
    }
    let course_count = courses.len();

    let pipeline = Pipeline::from_settings(Arc::new(Banner::from_settings(settings)), settings);
    let Aggregate { mut rows, errors } = pipeline.run(courses).await;

    report::sort_rows(&mut rows);
    let file = File::create(&args.output)
        .with_context(|| format!("cannot create {}", args.output.display()))?;
    report::write_csv(&rows, BufWriter::new(file))
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "wrote {} rows for {} courses to {}",
        rows.len(),
        course_count,
        args.output.display()
    );

    if errors.is_empty() {
        return Ok(Outcome::Complete);
    }

    eprintln!("{} errors:", errors.len());
    for error in &errors {
        eprintln!("  {error}");
    }
    Ok(Outcome::Partial)
}
