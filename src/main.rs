//! jk-nodes CLI
//!
//! Runs single pack nodes against image files and prints node metadata.

use anyhow::{anyhow, bail, Context, Result};
use jk_nodes::prelude::*;
use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("jk-nodes").to_string();

    if let Err(error) = run(&program, &args[1.min(args.len())..]) {
        eprintln!("❌ {:#}", error);
        std::process::exit(1);
    }
}

fn run(program: &str, args: &[String]) -> Result<()> {
    let (config_path, args) = split_config_flag(args)?;
    let config = match config_path {
        Some(path) => PackConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PackConfig::default(),
    };
    let registry = FilterRegistry::with_config(config);

    let Some(command) = args.first() else {
        print_usage(program);
        return Ok(());
    };
    let rest = &args[1..];

    match command.as_str() {
        "list" => list_nodes(&registry),
        "info" => {
            let id = rest.first().ok_or_else(|| anyhow!("please specify a node ID"))?;
            let json = rest.iter().any(|arg| arg == "--json");
            node_info(&registry, id, json)?;
        }
        "resize" => resize(&registry, rest)?,
        "crop" => crop(&registry, rest)?,
        "concat" => concat(&registry, rest)?,
        "stack" => stack(&registry, rest)?,
        "resolve" => resolve(&registry, rest)?,
        "shape" => shape(&registry, rest)?,
        "help" | "--help" | "-h" => print_usage(program),
        other => {
            print_usage(program);
            bail!("unknown command: {}", other);
        }
    }
    Ok(())
}

fn print_usage(program: &str) {
    println!("🧩 jk-nodes v{}", jk_nodes::VERSION);
    println!();
    println!("Usage: {} [--config <file>] <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  list                                  List all nodes");
    println!("  info <node> [--json]                  Show detailed info about a node");
    println!("  resize <in> <out> <W>x<H> [method]    Resize an image");
    println!("  crop <in> <out> <ratio>               Center crop to a width/height ratio");
    println!("  concat <a> <b> <out> [direction] [method] [--no-match]");
    println!("                                        Join two images side by side");
    println!("  stack <out> <in>...                   Stack images into one batch");
    println!("  resolve <W:H>                         SDXL resolution for an aspect ratio");
    println!("  shape <file>...                       Print [B, H, W, C] for images");
    println!("  help                                  Show this help message");
    println!();
    println!("Resize methods: {}", ResizeMethod::names().join(", "));
}

// ============================================================================
// Metadata commands
// ============================================================================

fn list_nodes(registry: &FilterRegistry) {
    println!("Available nodes ({} total):", registry.len());
    println!();

    for (category, nodes) in registry.grouped_by_category() {
        println!("  📁 {}", category.path(&registry.config().category_root));
        for metadata in nodes {
            println!(
                "      • {} ({}) - {}",
                metadata.id,
                registry.config().display_name(&metadata.name),
                metadata.description
            );
        }
        println!();
    }
}

fn node_info(registry: &FilterRegistry, id: &str, json: bool) -> Result<()> {
    let metadata = registry
        .get_metadata(id)
        .ok_or_else(|| anyhow!("node not found: {} (use 'list' to see available nodes)", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(metadata)?);
        return Ok(());
    }

    println!("Node: {}", registry.config().display_name(&metadata.name));
    println!("ID: {}", metadata.id);
    println!("Category: {}", metadata.category.path(&registry.config().category_root));
    println!("Version: {}", metadata.version);
    if metadata.output_node {
        println!("Output node: yes");
    }
    println!();
    println!("Description:");
    println!("  {}", metadata.description);
    println!();

    if !metadata.inputs.is_empty() {
        println!("Inputs:");
        for port in &metadata.inputs {
            let optional = if port.optional { " (optional)" } else { "" };
            println!("  • {} [{}]{}", port.name, port.port_type.display_name(), optional);
            if !port.description.is_empty() {
                println!("    {}", port.description);
            }
        }
        println!();
    }

    if !metadata.outputs.is_empty() {
        println!("Outputs:");
        for port in &metadata.outputs {
            println!("  • {} [{}]", port.name, port.port_type.display_name());
        }
        println!();
    }

    if !metadata.parameters.is_empty() {
        println!("Parameters:");
        for param in &metadata.parameters {
            println!(
                "  • {} [{}] = {}",
                param.name,
                param.param_type.display_name(),
                param.default_value
            );
            if !param.description.is_empty() {
                println!("    {}", param.description);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Image commands
// ============================================================================

fn resize(registry: &FilterRegistry, args: &[String]) -> Result<()> {
    let [input, output, dimensions, rest @ ..] = args else {
        bail!("usage: resize <in> <out> <W>x<H> [method]");
    };
    let (width, height) = parse_dimensions(dimensions)
        .ok_or_else(|| anyhow!("invalid dimensions '{}', expected <W>x<H>", dimensions))?;

    let mut params = HashMap::new();
    params.insert("width".to_string(), Value::Integer(width));
    params.insert("height".to_string(), Value::Integer(height));
    if let Some(method) = rest.first() {
        params.insert("method".to_string(), Value::String(method.clone()));
    }

    let inputs = image_inputs([("image", input.as_str())])?;
    let result = NodeInvoker::new(registry).invoke("resize_image", inputs, params)?;
    save_output(&result, "image", output)
}

fn crop(registry: &FilterRegistry, args: &[String]) -> Result<()> {
    let [input, output, ratio, ..] = args else {
        bail!("usage: crop <in> <out> <ratio>");
    };
    let ratio: f64 = ratio
        .parse()
        .with_context(|| format!("invalid aspect ratio '{}'", ratio))?;

    let mut params = HashMap::new();
    params.insert("aspect_ratio".to_string(), Value::Float(ratio));

    let inputs = image_inputs([("image", input.as_str())])?;
    let result = NodeInvoker::new(registry).invoke("center_crop_image", inputs, params)?;
    save_output(&result, "image", output)
}

fn concat(registry: &FilterRegistry, args: &[String]) -> Result<()> {
    let [first, second, output, rest @ ..] = args else {
        bail!("usage: concat <a> <b> <out> [direction] [method] [--no-match]");
    };

    let mut params = HashMap::new();
    let mut positional = rest.iter().filter(|arg| !arg.starts_with("--"));
    if let Some(direction) = positional.next() {
        params.insert("direction".to_string(), Value::String(direction.clone()));
    }
    if let Some(method) = positional.next() {
        params.insert("method".to_string(), Value::String(method.clone()));
    }
    if rest.iter().any(|arg| arg == "--no-match") {
        params.insert("match_image_size".to_string(), Value::Boolean(false));
    }

    let inputs = image_inputs([("image1", first.as_str()), ("image2", second.as_str())])?;
    let result = NodeInvoker::new(registry).invoke("concatenate_images", inputs, params)?;
    save_output(&result, "image", output)
}

fn stack(registry: &FilterRegistry, args: &[String]) -> Result<()> {
    let [output, files @ ..] = args else {
        bail!("usage: stack <out> <in>...");
    };
    let slots = registry.config().stack_slots;
    if files.is_empty() || files.len() > slots {
        bail!("stack takes between 1 and {} input images", slots);
    }

    let names: Vec<String> = (1..=files.len()).map(|i| format!("images_{}", i)).collect();
    let inputs = image_inputs(names.iter().map(String::as_str).zip(files.iter().map(String::as_str)))?;
    let result = NodeInvoker::new(registry).invoke("stack_images_to_batch", inputs, HashMap::new())?;

    let batch = output_image(&result, "image")?;
    for index in 0..batch.len() {
        let path = indexed_path(Path::new(output), index);
        batch.to_dynamic_image(index)?.save(&path)?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn shape(registry: &FilterRegistry, files: &[String]) -> Result<()> {
    if files.is_empty() {
        bail!("usage: shape <file>...");
    }
    let invoker = NodeInvoker::new(registry);
    for file in files {
        let inputs = image_inputs([("image", file.as_str())])?;
        let result = invoker.invoke("get_image_shape", inputs, HashMap::new())?;
        let shape = result.display.unwrap_or_default().join(" ");
        println!("{}: {}", file, shape);
    }
    Ok(())
}

fn resolve(registry: &FilterRegistry, args: &[String]) -> Result<()> {
    let ratio = args.first().ok_or_else(|| anyhow!("usage: resolve <W:H>"))?;

    let mut params = HashMap::new();
    params.insert("aspect_ratio".to_string(), Value::String(ratio.clone()));
    let result = NodeInvoker::new(registry).invoke("sdxl_aspect_ratio_to_width_height", HashMap::new(), params)?;

    let width = result.get("width").and_then(Value::as_integer).unwrap_or_default();
    let height = result.get("height").and_then(Value::as_integer).unwrap_or_default();
    println!("{} -> {}x{}", ratio, width, height);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn split_config_flag(args: &[String]) -> Result<(Option<PathBuf>, Vec<String>)> {
    let mut config = None;
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().ok_or_else(|| anyhow!("--config requires a file path"))?;
            config = Some(PathBuf::from(path));
        } else {
            rest.push(arg.clone());
        }
    }
    Ok((config, rest))
}

fn image_inputs<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<HashMap<String, Value>> {
    files
        .into_iter()
        .map(|(port, path)| {
            let image = image::open(path).with_context(|| format!("failed to open {}", path))?;
            info!("Loaded {} ({}x{})", path, image.width(), image.height());
            Ok::<_, anyhow::Error>((port.to_string(), Value::Image(ImageBatch::from_dynamic_image(&image))))
        })
        .collect()
}

fn output_image<'a>(output: &'a NodeOutput, port: &str) -> Result<&'a ImageBatch> {
    output
        .get(port)
        .and_then(Value::as_image)
        .ok_or_else(|| anyhow!("node produced no image on '{}'", port))
}

fn save_output(output: &NodeOutput, port: &str, path: &str) -> Result<()> {
    let batch = output_image(output, port)?;
    batch.to_dynamic_image(0)?.save(path)?;
    println!("🎉 Saved {} {}", path, batch.shape());
    Ok(())
}

fn indexed_path(path: &Path, index: usize) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, index, ext),
        None => format!("{}_{}", stem, index),
    };
    path.with_file_name(name)
}

fn parse_dimensions(s: &str) -> Option<(i64, i64)> {
    let (w, h) = s.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}
