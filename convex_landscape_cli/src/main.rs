use std::collections::{HashMap, HashSet};
use std::fs;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use convex_landscape::{
    format_number, format_points_crlf, parse_terrain, parse_terrain_json, sample_terrain,
    split_and_convexify_with, ConvexLandscape, LandscapeSummary, Params, Point, Terrain,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convex landscape builder for landing-site terrain", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the convex landscape for one or more terrain files
    Convex(ConvexArgs),
    /// Report landing site, highest point and chain sizes for a terrain
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct ConvexArgs {
    /// Terrain files to read (`-` for stdin)
    #[arg(value_hint = ValueHint::FilePath, required_unless_present = "sample")]
    inputs: Vec<PathBuf>,

    /// Use the built-in puzzle terrain
    #[arg(long, action = ArgAction::SetTrue)]
    sample: bool,

    /// Output path (`-` for stdout, a directory when several inputs are given)
    #[arg(short, long, default_value = "-", value_hint = ValueHint::AnyPath)]
    output: PathBuf,

    /// Output layout
    #[arg(long, value_enum, default_value_t = FormatOpt::Crlf)]
    format: FormatOpt,

    #[command(flatten)]
    terrain: TerrainOpts,

    /// Replace a point before computing, as INDEX=X,Y (repeatable)
    #[arg(long = "set", value_name = "INDEX=X,Y")]
    set: Vec<String>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Log stage timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Terrain file to read (`-` for stdin)
    #[arg(value_hint = ValueHint::FilePath, required_unless_present = "sample")]
    input: Option<PathBuf>,

    /// Use the built-in puzzle terrain
    #[arg(long, action = ArgAction::SetTrue)]
    sample: bool,

    /// Emit the report as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    #[command(flatten)]
    terrain: TerrainOpts,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(clap::Args, Debug)]
struct TerrainOpts {
    /// Input layout
    #[arg(long, value_enum, default_value_t = InputOpt::Auto)]
    input_format: InputOpt,

    /// Optional params JSON path
    #[arg(long, value_hint = ValueHint::FilePath)]
    params: Option<PathBuf>,

    /// x of the anchor inserted when the left chain resets at a peak
    #[arg(long)]
    left_boundary_x: Option<f64>,

    /// Skip strictly-increasing x checks
    #[arg(long, action = ArgAction::SetTrue)]
    no_validate: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FormatOpt {
    /// `x,y` lines joined by CRLF
    Crlf,
    Csv,
    Json,
}

impl FormatOpt {
    fn extension(self) -> &'static str {
        match self {
            FormatOpt::Crlf => "txt",
            FormatOpt::Csv => "csv",
            FormatOpt::Json => "json",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum InputOpt {
    Auto,
    Text,
    Json,
}

#[derive(Clone, Debug, PartialEq)]
enum TerrainSource {
    Sample,
    Stdin,
    File(PathBuf),
}

impl TerrainSource {
    fn from_path(path: &Path) -> Self {
        if path.as_os_str() == "-" {
            TerrainSource::Stdin
        } else {
            TerrainSource::File(path.to_path_buf())
        }
    }

    fn label(&self) -> String {
        match self {
            TerrainSource::Sample => "sample".to_string(),
            TerrainSource::Stdin => "stdin".to_string(),
            TerrainSource::File(path) => path.display().to_string(),
        }
    }

    fn stem(&self) -> String {
        match self {
            TerrainSource::File(path) => path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("terrain")
                .to_string(),
            other => other.label(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = match &cli.command {
        Command::Convex(args) => {
            if args.verbose {
                "debug"
            } else {
                "info"
            }
        }
        Command::Inspect(args) => {
            if args.verbose {
                "debug"
            } else {
                "info"
            }
        }
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Convex(args) => handle_convex(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

fn handle_convex(args: ConvexArgs) -> Result<()> {
    let params = build_params(&args.terrain)?;
    let edits = args
        .set
        .iter()
        .map(|raw| parse_set_arg(raw))
        .collect::<Result<Vec<_>>>()?;

    let mut sources: Vec<TerrainSource> = args.inputs.iter().map(|p| TerrainSource::from_path(p)).collect();
    if args.sample {
        sources.insert(0, TerrainSource::Sample);
    }
    if sources.iter().filter(|s| **s == TerrainSource::Stdin).count() > 1 {
        return Err(anyhow!("stdin (`-`) may only be given once"));
    }
    if sources.is_empty() {
        return Err(anyhow!("no terrain inputs supplied"));
    }
    let to_stdout = args.output.as_os_str() == "-";
    if to_stdout && sources.len() > 1 {
        return Err(anyhow!(
            "{} terrains supplied but output is stdout; pass -o <dir> to write one file per terrain",
            sources.len()
        ));
    }

    let t_compute = Instant::now();
    let jobs: Vec<(usize, TerrainSource)> = sources.into_iter().enumerate().collect();
    let mut results = jobs
        .par_iter()
        .map(|(id, source)| -> Result<(usize, TerrainSource, ConvexLandscape)> {
            let mut terrain = load_terrain(source, args.terrain.input_format, &params)?;
            for (index, point) in &edits {
                terrain = terrain
                    .with_point_replaced(*index, *point, &params)
                    .with_context(|| format!("failed to edit {}", source.label()))?;
            }
            let landscape = split_and_convexify_with(&terrain, &params);
            Ok((*id, source.clone(), landscape))
        })
        .collect::<Result<Vec<_>>>()?;
    results.sort_by_key(|(id, _, _)| *id);

    if args.profile || args.verbose {
        info!(
            "Compute stage: {:.1} ms ({} terrains)",
            t_compute.elapsed().as_secs_f64() * 1000.0,
            results.len()
        );
    }

    let many = results.len() > 1;
    let paths = if to_stdout {
        Vec::new()
    } else if many {
        fs::create_dir_all(&args.output)
            .with_context(|| format!("failed to create {}", args.output.display()))?;
        let sources: Vec<&TerrainSource> = results.iter().map(|(_, source, _)| source).collect();
        output_paths(&args.output, &sources, args.format)?
    } else {
        vec![args.output.clone()]
    };

    for (slot, (_, source, landscape)) in results.iter().enumerate() {
        info!(
            "{}: {} convex points, landing site at index {}",
            source.label(),
            landscape.convex_landscape.len(),
            landscape.landing_site_left_index
        );
        if !landscape.flat_pair_preserved() {
            warn!("{}: no flat landing pair at the split", source.label());
        }

        if to_stdout {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_landscape(landscape, args.format, &mut handle)?;
            handle.flush()?;
        } else {
            let path = &paths[slot];
            let mut file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_landscape(landscape, args.format, &mut file)?;
            info!("Wrote convex landscape: {}", path.display());
        }
    }

    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let params = build_params(&args.terrain)?;
    let source = match (&args.input, args.sample) {
        (_, true) => TerrainSource::Sample,
        (Some(path), false) => TerrainSource::from_path(path),
        (None, false) => return Err(anyhow!("no terrain input supplied")),
    };

    let terrain = load_terrain(&source, args.terrain.input_format, &params)?;
    let landscape = split_and_convexify_with(&terrain, &params);
    let summary = LandscapeSummary::from_landscape(&terrain, &landscape);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut handle, &summary)?;
        writeln!(handle)?;
    } else {
        write_summary_text(&source, &summary, &mut handle)?;
    }
    Ok(())
}

fn build_params(opts: &TerrainOpts) -> Result<Params> {
    let mut params = match opts.params.as_ref() {
        Some(path) => load_params(path)?,
        None => Params::default(),
    };
    if let Some(x) = opts.left_boundary_x {
        params.left_boundary_x = x;
    }
    if opts.no_validate {
        params.validate = false;
    }
    params.check()?;
    debug!(?params, "resolved params");
    Ok(params)
}

fn load_params(path: &Path) -> Result<Params> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read params {}", path.display()))?;
    Params::from_json(&text).with_context(|| format!("{} is not a valid params file", path.display()))
}

fn load_terrain(source: &TerrainSource, input: InputOpt, params: &Params) -> Result<Terrain> {
    let (text, hint) = match source {
        TerrainSource::Sample => return Ok(sample_terrain()),
        TerrainSource::Stdin => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read terrain from stdin")?;
            (buf, None)
        }
        TerrainSource::File(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            (text, path.extension().and_then(|ext| ext.to_str()))
        }
    };

    let points = match resolve_input_format(input, hint, &text) {
        InputOpt::Json => parse_terrain_json(&text),
        _ => parse_terrain(&text),
    }
    .with_context(|| format!("failed to parse {}", source.label()))?;
    debug!("{}: parsed {} points", source.label(), points.len());

    Terrain::with_params(points, params)
        .with_context(|| format!("invalid terrain in {}", source.label()))
}

fn resolve_input_format(requested: InputOpt, extension: Option<&str>, text: &str) -> InputOpt {
    match requested {
        InputOpt::Auto => {
            let is_json_ext = extension.is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if is_json_ext || text.trim_start().starts_with('[') {
                InputOpt::Json
            } else {
                InputOpt::Text
            }
        }
        other => other,
    }
}

fn parse_set_arg(raw: &str) -> Result<(usize, Point)> {
    let (index, coords) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid --set '{}': expected INDEX=X,Y", raw))?;
    let index: usize = index
        .trim()
        .parse()
        .with_context(|| format!("invalid --set index '{}'", index))?;
    let (x, y) = coords
        .split_once(',')
        .ok_or_else(|| anyhow!("invalid --set '{}': expected INDEX=X,Y", raw))?;
    let x: f64 = x
        .trim()
        .parse()
        .with_context(|| format!("invalid --set x '{}'", x))?;
    let y: f64 = y
        .trim()
        .parse()
        .with_context(|| format!("invalid --set y '{}'", y))?;
    Ok((index, Point::new(x, y)))
}

fn output_path_for(dir: &Path, source: &TerrainSource, format: FormatOpt) -> PathBuf {
    dir.join(format!("{}.convex.{}", source.stem(), format.extension()))
}

/// One output file per source. Sources sharing a stem get their position as a prefix.
fn output_paths(dir: &Path, sources: &[&TerrainSource], format: FormatOpt) -> Result<Vec<PathBuf>> {
    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for source in sources {
        *stem_counts.entry(source.stem()).or_default() += 1;
    }

    let mut seen = HashSet::new();
    let mut paths = Vec::with_capacity(sources.len());
    for (id, source) in sources.iter().enumerate() {
        let stem = source.stem();
        let path = if stem_counts.get(&stem).copied().unwrap_or(0) > 1 {
            dir.join(format!("{}-{}.convex.{}", id, stem, format.extension()))
        } else {
            output_path_for(dir, source, format)
        };
        if !seen.insert(path.clone()) {
            return Err(anyhow!(
                "output {} would be written twice; rename one of the inputs",
                path.display()
            ));
        }
        paths.push(path);
    }
    Ok(paths)
}

fn write_landscape<W: Write>(
    landscape: &ConvexLandscape,
    format: FormatOpt,
    writer: &mut W,
) -> Result<()> {
    match format {
        FormatOpt::Crlf => {
            let text = format_points_crlf(&landscape.convex_landscape);
            writer.write_all(text.as_bytes())?;
            writer.write_all(b"\r\n")?;
        }
        FormatOpt::Csv => {
            let mut csv_writer = csv::Writer::from_writer(writer);
            write_landscape_rows(landscape, &mut csv_writer)?;
        }
        FormatOpt::Json => {
            serde_json::to_writer_pretty(&mut *writer, landscape)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn write_landscape_rows<W: Write>(
    landscape: &ConvexLandscape,
    writer: &mut csv::Writer<W>,
) -> Result<()> {
    writer.write_record(["index", "x", "y", "side"])?;
    for (index, point) in landscape.convex_landscape.iter().enumerate() {
        let side = if index < landscape.landing_site_left_index {
            "left"
        } else {
            "right"
        };
        writer.write_record([
            index.to_string(),
            format_number(point.x),
            format_number(point.y),
            side.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_summary_text<W: Write>(
    source: &TerrainSource,
    summary: &LandscapeSummary,
    writer: &mut W,
) -> Result<()> {
    writeln!(writer, "Terrain: {}", source.label())?;
    writeln!(writer, "  points: {}", summary.terrain_points)?;
    if let Some((min_x, max_x)) = summary.x_range {
        writeln!(writer, "  x range: {} .. {}", min_x, max_x)?;
    }
    match summary.landing_site {
        Some((left, right)) => writeln!(
            writer,
            "  landing site: index {} ({}, {}) .. ({}, {})",
            summary.landing_site_index, left.x, left.y, right.x, right.y
        )?,
        None => writeln!(writer, "  landing site: none (split at index 0)")?,
    }
    if let Some(peak) = summary.highest_point {
        writeln!(writer, "  highest point: ({}, {})", peak.x, peak.y)?;
    }
    writeln!(
        writer,
        "  convex chains: {} left, {} right",
        summary.left_chain_points, summary.right_chain_points
    )?;
    writeln!(
        writer,
        "  flat pair preserved: {}",
        if summary.flat_pair_preserved { "yes" } else { "no" }
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use convex_landscape::split_and_convexify;

    #[test]
    fn test_parse_set_arg() {
        let (index, point) = parse_set_arg("3=1500,2000").unwrap();
        assert_eq!(index, 3);
        assert_eq!(point, Point::new(1500.0, 2000.0));
        assert!(parse_set_arg("3:1500,2000").is_err());
        assert!(parse_set_arg("x=1,2").is_err());
        assert!(parse_set_arg("1=1").is_err());
    }

    #[test]
    fn test_resolve_input_format() {
        assert_eq!(resolve_input_format(InputOpt::Auto, Some("JSON"), ""), InputOpt::Json);
        assert_eq!(resolve_input_format(InputOpt::Auto, None, "  [{\"x\":0,\"y\":1}]"), InputOpt::Json);
        assert_eq!(resolve_input_format(InputOpt::Auto, Some("txt"), "2\n0 1\n5 1"), InputOpt::Text);
        assert_eq!(resolve_input_format(InputOpt::Text, Some("json"), "[]"), InputOpt::Text);
    }

    #[test]
    fn test_write_crlf() {
        let landscape = split_and_convexify(&sample_terrain());
        let mut buf = Vec::new();
        write_landscape(&landscape, FormatOpt::Crlf, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("0,2700\r\n1500,2700\r\n"));
        assert!(text.ends_with("6999,2600\r\n"));
    }

    #[test]
    fn test_write_csv_marks_sides() {
        let landscape = split_and_convexify(&sample_terrain());
        let mut buf = Vec::new();
        write_landscape(&landscape, FormatOpt::Csv, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "index,x,y,side");
        assert_eq!(lines[4], "3,3500,200,left");
        assert_eq!(lines[5], "4,5000,200,right");
        assert_eq!(lines.len(), 1 + landscape.convex_landscape.len());
    }

    #[test]
    fn test_write_json() {
        let landscape = split_and_convexify(&sample_terrain());
        let mut buf = Vec::new();
        write_landscape(&landscape, FormatOpt::Json, &mut buf).unwrap();
        let parsed: ConvexLandscape = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed, landscape);
    }

    #[test]
    fn test_output_path_for() {
        let source = TerrainSource::File(PathBuf::from("maps/cave.txt"));
        assert_eq!(
            output_path_for(Path::new("out"), &source, FormatOpt::Csv),
            PathBuf::from("out/cave.convex.csv")
        );
        assert_eq!(
            output_path_for(Path::new("out"), &TerrainSource::Sample, FormatOpt::Crlf),
            PathBuf::from("out/sample.convex.txt")
        );
    }

    #[test]
    fn test_output_paths_keep_same_stem_sources_apart() {
        let east = TerrainSource::File(PathBuf::from("east/cave.txt"));
        let west = TerrainSource::File(PathBuf::from("west/cave.txt"));
        let ridge = TerrainSource::File(PathBuf::from("ridge.txt"));
        let paths = output_paths(Path::new("out"), &[&east, &west, &ridge], FormatOpt::Crlf).unwrap();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("out/0-cave.convex.txt"),
                PathBuf::from("out/1-cave.convex.txt"),
                PathBuf::from("out/ridge.convex.txt"),
            ]
        );

        let file = TerrainSource::File(PathBuf::from("maps/sample.txt"));
        let paths = output_paths(Path::new("out"), &[&TerrainSource::Sample, &file], FormatOpt::Csv).unwrap();
        assert_ne!(paths[0], paths[1]);
    }

    #[test]
    fn test_output_paths_reject_prefixed_collision() {
        let a = TerrainSource::File(PathBuf::from("a/cave.txt"));
        let b = TerrainSource::File(PathBuf::from("b/cave.txt"));
        let prefixed = TerrainSource::File(PathBuf::from("0-cave.txt"));
        assert!(output_paths(Path::new("out"), &[&a, &b, &prefixed], FormatOpt::Crlf).is_err());
    }

    #[test]
    fn test_csv_writes_negative_zero_as_zero() {
        let landscape = ConvexLandscape {
            convex_landscape: vec![Point::new(-0.0, 10.0), Point::new(5.0, -0.0)],
            landing_site_left_index: 1,
        };
        let mut buf = Vec::new();
        write_landscape(&landscape, FormatOpt::Csv, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("0,0,10,left"));
        assert!(text.contains("1,5,0,right"));
        assert!(!text.contains("-0"));
    }

    #[test]
    fn test_convex_rejects_several_inputs_to_stdout() {
        let cli = Cli::try_parse_from(["convex-landscape", "convex", "--sample", "a.txt"]).unwrap();
        let Command::Convex(args) = cli.command else {
            panic!("expected convex command");
        };
        let err = handle_convex(args).unwrap_err();
        assert!(err.to_string().contains("output is stdout"));
    }

    #[test]
    fn test_set_edit_honours_no_validate() {
        let terrain = Terrain::new_unchecked(vec![
            Point::new(0.0, 100.0),
            Point::new(0.0, 200.0),
            Point::new(10.0, 200.0),
        ]);
        let opts = TerrainOpts {
            input_format: InputOpt::Auto,
            params: None,
            left_boundary_x: None,
            no_validate: true,
        };
        let params = build_params(&opts).unwrap();
        let (index, point) = parse_set_arg("0=0,150").unwrap();
        let edited = terrain.with_point_replaced(index, point, &params).unwrap();
        assert_eq!(edited.points()[0], Point::new(0.0, 150.0));
    }

    #[test]
    fn test_build_params_overrides() {
        let opts = TerrainOpts {
            input_format: InputOpt::Auto,
            params: None,
            left_boundary_x: Some(-5.0),
            no_validate: true,
        };
        let params = build_params(&opts).unwrap();
        assert_eq!(params.left_boundary_x, -5.0);
        assert!(!params.validate);

        let bad = TerrainOpts {
            left_boundary_x: Some(f64::INFINITY),
            no_validate: false,
            ..opts
        };
        assert!(build_params(&bad).is_err());
    }

    #[test]
    fn test_summary_text() {
        let terrain = sample_terrain();
        let landscape = split_and_convexify(&terrain);
        let summary = LandscapeSummary::from_landscape(&terrain, &landscape);
        let mut buf = Vec::new();
        write_summary_text(&TerrainSource::Sample, &summary, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("landing site: index 7 (3500, 200) .. (5000, 200)"));
        assert!(text.contains("convex chains: 4 left, 5 right"));
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "convex-landscape",
            "convex",
            "--sample",
            "--format",
            "csv",
            "--set",
            "2=350,1450",
        ])
        .unwrap();
        match cli.command {
            Command::Convex(args) => {
                assert!(args.sample);
                assert_eq!(args.format, FormatOpt::Csv);
                assert_eq!(args.set, vec!["2=350,1450".to_string()]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
