// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::Args;
use futures::stream::{self, StreamExt};
use kdam::BarExt;

use slideseg_core::config::SlideSegConfig;
use slideseg_core::constant;
use slideseg_core::error::SlideSegError;
use slideseg_core::io::{AnnotationKeyStore, read_annotations};
use slideseg_core::tile::{self, SlideSummary};
use slideseg_core::ut;

use super::TileArgs;

#[derive(Debug, Args)]
#[command(about = "Generate chips and masks from a directory of slides.")]
pub struct ChipsBatchArgs {
    #[arg(short = 'i', long, help = "Slide directory.", required = true)]
    pub slides: Option<String>,

    #[arg(
        short = 'a',
        long,
        help = "Annotation directory holding <slide>.roi or <slide>.xml files.",
        required = true
    )]
    pub annotations: Option<String>,

    #[arg(
        short = 'o',
        long,
        help = "Output directory, one <slide>_output per slide [default: slide directory]."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'k',
        long,
        help = "Shared annotation key file [default: <output>/annotation_keys.txt]."
    )]
    pub keys: Option<String>,

    #[arg(long, help = "Substring specifying slides (e.g. _HE).")]
    pub slide_substring: Option<String>,

    #[command(flatten)]
    pub tile: TileArgs,

    #[arg(
        short = 't',
        long,
        help = "Number of slides processed concurrently.",
        default_value = "1"
    )]
    pub threads: Option<usize>,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,
}

pub fn chips_batch(args: &ChipsBatchArgs) {
    let (Some(slides), Some(annotations)) = (args.slides.as_ref(), args.annotations.as_ref())
    else {
        eprintln!(
            "[slideseg::chips::batch] ERROR: Both --slides/-i and --annotations/-a must be specified."
        );
        std::process::exit(1);
    };

    let threads = args.threads.unwrap_or(1);

    if threads < 1 {
        eprintln!("[slideseg::chips::batch] ERROR: threads cannot be less than 1.");
        std::process::exit(1);
    }

    let slide_files = ut::path::collect_file_paths(
        slides,
        constant::SUPPORTED_SLIDE_FORMATS.as_slice(),
        args.slide_substring.to_owned(),
    )
    .unwrap_or_else(|err| {
        eprintln!("[slideseg::chips::batch] ERROR: {}", err);
        std::process::exit(1);
    });

    if slide_files.is_empty() {
        eprintln!(
            "[slideseg::chips::batch] ERROR: No slides were detected. Please check your path and/or substring identifier."
        );
        std::process::exit(1);
    }

    let (pairs, missing) = ut::path::collect_slide_pairs(&slide_files, annotations);

    ut::track::progress_log(
        &format!(
            "Detected {} slide and annotation pairs ({} slides without annotations).",
            ut::track::thousands_format(pairs.len()),
            ut::track::thousands_format(missing.len())
        ),
        args.verbose,
    );

    let output = PathBuf::from(args.output.to_owned().unwrap_or(slides.to_owned()));

    let output = ut::path::ensure_directory(&output).unwrap_or_else(|err| {
        eprintln!("[slideseg::chips::batch] ERROR: {}", err);
        std::process::exit(1);
    });

    let key_path = args
        .keys
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| output.join("annotation_keys.txt"));

    let mut failure: Vec<String> = missing
        .iter()
        .map(|slide| {
            format!(
                "{}\t{}",
                slide.display(),
                SlideSegError::NoFileError(format!("No annotation in {}", annotations))
            )
        })
        .collect();

    // Every class is assigned a color before any slide runs so that the
    // concurrent runs can share one read-only snapshot of the key store
    let mut store = AnnotationKeyStore::open_or_generate(&key_path, annotations)
        .unwrap_or_else(|err| {
            eprintln!("[slideseg::chips::batch] ERROR: {}", err);
            std::process::exit(1);
        });

    let mut configs: Vec<(String, SlideSegConfig)> = Vec::with_capacity(pairs.len());

    for (stem, slide, annotation) in pairs {
        let prepared = sync_keys(&mut store, &annotation).and_then(|_| {
            slide_config(&slide, annotations, &output, &stem, &key_path, args)
        });

        match prepared {
            Ok(config) => configs.push((stem, config)),
            Err(err) => failure.push(format!("{}\t{}", stem, err)),
        }
    }

    ut::track::progress_log(
        &format!(
            "Synchronized {} annotation keys in {}.",
            ut::track::thousands_format(store.len()),
            key_path.display()
        ),
        args.verbose,
    );

    let rt = tokio::runtime::Runtime::new().unwrap_or_else(|err| {
        eprintln!("[slideseg::chips::batch] ERROR: Could not start runtime. {}", err);
        std::process::exit(1);
    });

    let results = rt.block_on(run_all(configs, store.detached(), threads, args.verbose));

    let mut chips = 0;
    let mut success: Vec<String> = Vec::with_capacity(results.len());

    for (stem, run) in results {
        match run {
            Ok(summary) => {
                chips += summary.chips;
                success.push(format!(
                    "{}\t{}\t{}\t{}",
                    stem, summary.chips, summary.annotated, summary.blank
                ));
            }
            Err(err) => failure.push(format!("{}\t{}", stem, err)),
        }
    }

    success.sort();
    failure.sort();

    if args.verbose {
        println!();
    }

    ut::track::progress_log(
        &format!(
            "Complete. {} chips saved across {} slides ({} failed).",
            ut::track::thousands_format(chips),
            ut::track::thousands_format(success.len()),
            ut::track::thousands_format(failure.len())
        ),
        args.verbose,
    );

    if !success.is_empty() {
        write_report(&output.join("slide_counts.tsv"), &success);
    }

    if !failure.is_empty() {
        write_report(&output.join("slide_errors.tsv"), &failure);
    }
}

/// Assign colors to every class in an annotation file
fn sync_keys(store: &mut AnnotationKeyStore, annotation: &Path) -> Result<(), SlideSegError> {
    for region in read_annotations(annotation)? {
        store.resolve(&region.name)?;
    }

    Ok(())
}

fn slide_config(
    slide: &Path,
    annotations: &str,
    output: &Path,
    stem: &str,
    key_path: &Path,
    args: &ChipsBatchArgs,
) -> Result<SlideSegConfig, SlideSegError> {
    let mut config = SlideSegConfig::new(slide, annotations)?;

    config.output_dir = output.join(format!("{}_output", stem));
    config.key_path = key_path.to_path_buf();
    config.verbose = false;

    args.tile.apply(&mut config)?;

    Ok(config)
}

fn write_report(path: &Path, lines: &[String]) {
    std::fs::write(path, lines.join("\n")).unwrap_or_else(|err| {
        eprintln!(
            "[slideseg::chips::batch] ERROR: Could not write {}. {}",
            path.display(),
            err
        );
        std::process::exit(1);
    });
}

pub async fn run_all(
    configs: Vec<(String, SlideSegConfig)>,
    store: AnnotationKeyStore,
    threads: usize,
    verbose: bool,
) -> Vec<(String, Result<SlideSummary, SlideSegError>)> {
    let pb = Arc::new(Mutex::new(ut::track::progress_bar(
        configs.len(),
        "Processing",
        verbose,
    )));

    stream::iter(configs)
        .map(|(stem, config)| {
            let mut store = store.detached();
            let pb_clone = pb.clone();

            async move {
                let stem_clone = stem.clone();
                let result = tokio::task::spawn_blocking(move || {
                    tile::run_slide_with_store(&config, &mut store)
                })
                .await
                .unwrap_or_else(|_| {
                    Err(SlideSegError::IoError(format!(
                        "Worker for {} stopped unexpectedly.",
                        stem
                    ))
                    .in_slide(&stem))
                });

                if verbose {
                    if let Ok(mut bar) = pb_clone.lock() {
                        let _ = bar.update(1);
                    }
                }

                (stem_clone, result)
            }
        })
        .buffer_unordered(threads)
        .collect::<Vec<_>>()
        .await
}
