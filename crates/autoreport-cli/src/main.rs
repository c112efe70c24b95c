use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use autoreport_core::{
	content_type_for_path, AnalysisConfig, Analysis, Analyzer, DigestEngine, HashAlgorithm,
	ReportLanguage, Upload, VerificationStatus,
};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Parser, Debug)]
#[command(name = "autoreport", version, about = "AutoReport - Forensic file analysis and reporting")]
struct Cli {
	/// JSON configuration file
	#[arg(long, global = true)]
	config: Option<PathBuf>,
	/// Abort digesting after this many seconds
	#[arg(long, global = true)]
	timeout_secs: Option<u64>,
	/// Run extraction and digesting on independent views of the file
	#[arg(long, global = true)]
	parallel: bool,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Extract metadata and hashes from a file
	Analyze {
		file: PathBuf,
		/// Declared content type (derived from the extension when omitted)
		#[arg(long)]
		content_type: Option<String>,
		/// Print the analysis as JSON
		#[arg(long)]
		json: bool,
	},
	/// Generate the forensic text report
	Report {
		file: PathBuf,
		#[arg(long)]
		content_type: Option<String>,
		/// Header language
		#[arg(long, value_enum)]
		lang: Option<Lang>,
		/// Write the report here instead of stdout
		#[arg(long)]
		out: Option<PathBuf>,
	},
	/// Print MD5, SHA1 and SHA256 digests
	Hash {
		file: PathBuf,
	},
	/// Compare a digest against a reference value
	Verify {
		file: PathBuf,
		/// md5, sha1 or sha256
		#[arg(long)]
		algorithm: HashAlgorithm,
		#[arg(long)]
		expected: String,
	},
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Lang {
	En,
	Pt,
}

impl From<Lang> for ReportLanguage {
	fn from(lang: Lang) -> Self {
		match lang {
			Lang::En => ReportLanguage::English,
			Lang::Pt => ReportLanguage::Portuguese,
		}
	}
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
	let mut config = match &cli.config {
		Some(path) => AnalysisConfig::from_json_file(path)
			.with_context(|| format!("Failed to load config: {:?}", path))?,
		None => AnalysisConfig::default(),
	};
	if cli.timeout_secs.is_some() {
		config.timeout_secs = cli.timeout_secs;
	}
	config.validate().context("Invalid configuration")?;
	tracing::debug!("Using configuration: {:?}", config);
	Ok(config)
}

fn progress_bar(path: &Path) -> Result<ProgressBar> {
	let total = std::fs::metadata(path)
		.with_context(|| format!("Failed to stat {:?}", path))?
		.len();
	let pb = ProgressBar::new(total);
	pb.set_style(
		ProgressStyle::default_bar()
			.template("[{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
			.progress_chars("=>-"),
	);
	Ok(pb)
}

fn file_name(path: &Path) -> String {
	path.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| path.display().to_string())
}

fn run_analysis(
	path: &Path,
	content_type: Option<&str>,
	analyzer: &mut Analyzer,
	parallel: bool,
) -> Result<Analysis> {
	let content_type = content_type.unwrap_or_else(|| content_type_for_path(path));
	let pb = progress_bar(path)?;
	pb.set_message(file_name(path));
	tracing::debug!(
		"Digesting {:?} in {} byte chunks",
		path,
		analyzer.config().effective_chunk_size()
	);

	let bar = pb.clone();
	analyzer.set_progress_callback(move |progress| bar.set_position(progress.bytes_processed));

	let analysis = if parallel {
		analyzer.analyze_parallel(&file_name(path), content_type, || File::open(path))
	} else {
		let mut upload = Upload::open(path, content_type)
			.with_context(|| format!("Failed to open {:?}", path))?;
		analyzer.analyze(&mut upload)
	};
	pb.finish_and_clear();

	analysis.with_context(|| format!("Analysis of {:?} failed", path))
}

fn print_analysis(analysis: &Analysis) {
	let metadata = &analysis.metadata;
	println!("📁 File: {}", metadata.file.name);
	println!("🏷️  Content-Type: {}", metadata.file.content_type);
	println!("💾 Size: {} bytes", metadata.file.size_bytes);
	if let Some(image) = &metadata.image {
		println!(
			"🖼️  Image: {} {} {}x{}",
			image.format, image.mode, image.width, image.height
		);
	}
	println!("🔖 Tags: {}", metadata.exif.len());
	if let Some(note) = &metadata.type_mismatch {
		println!("⚠️  Type check: {}", note);
	}
	if let Some(error) = &metadata.error {
		println!("❌ Extraction error: {}", error);
	}
	if metadata.is_degraded() {
		println!("⚠️  Metadata is incomplete; see the report for details");
	}
	println!();
	for (algorithm, digest) in analysis.hashes.entries() {
		println!("{:<7} {}", format!("{}:", algorithm), digest);
	}
}

fn main() -> Result<()> {
	// Initialize tracing
	tracing_subscriber::fmt::init();

	let cli = Cli::parse();
	let config = load_config(&cli)?;

	match &cli.command {
		Commands::Analyze { file, content_type, json } => {
			let mut analyzer = Analyzer::new(config)?;
			let analysis = run_analysis(file, content_type.as_deref(), &mut analyzer, cli.parallel)?;
			if *json {
				println!("{}", serde_json::to_string_pretty(&analysis)?);
			} else {
				print_analysis(&analysis);
			}
		}
		Commands::Report { file, content_type, lang, out } => {
			let mut config = config;
			if let Some(lang) = lang {
				config.language = (*lang).into();
			}
			let mut analyzer = Analyzer::new(config)?;
			let analysis = run_analysis(file, content_type.as_deref(), &mut analyzer, cli.parallel)?;
			let report = analysis.report(&analyzer.template());

			match out {
				Some(out) => {
					std::fs::write(out, report.render())
						.with_context(|| format!("Failed to write report to {:?}", out))?;
					println!("✅ Report written to {}", out.display());
					println!("🔐 Report SHA256: {}", report.sha256());
				}
				None => print!("{}", report),
			}
		}
		Commands::Hash { file } => {
			let mut upload = Upload::open(file, content_type_for_path(file))
				.with_context(|| format!("Failed to open {:?}", file))?;
			let pb = progress_bar(file)?;
			let bar = pb.clone();
			let mut engine = DigestEngine::from_config(&config);
			engine.set_progress_callback(move |progress| bar.set_position(progress.bytes_processed));

			let hashes = engine.digest(upload.source_mut())?;
			pb.finish_and_clear();
			for (algorithm, digest) in hashes.entries() {
				println!("{}  {}  {}", algorithm, digest, file.display());
			}
		}
		Commands::Verify { file, algorithm, expected } => {
			let mut upload = Upload::open(file, content_type_for_path(file))
				.with_context(|| format!("Failed to open {:?}", file))?;
			let hashes = DigestEngine::from_config(&config).digest(upload.source_mut())?;
			let verification = hashes.verify(*algorithm, expected);

			match verification.status {
				VerificationStatus::Verified => {
					println!("✅ {} verified: {}", verification.algorithm, verification.actual);
				}
				VerificationStatus::Mismatch => {
					println!("❌ {} mismatch", verification.algorithm);
					println!("   expected: {}", verification.expected);
					println!("   actual:   {}", verification.actual);
					bail!("{} digest of {:?} does not match", verification.algorithm, file);
				}
			}
		}
	}

	Ok(())
}
