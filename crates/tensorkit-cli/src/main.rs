mod cli;
mod json;

use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use tensorkit_core::{
    convert_to_tensor_with, get_tensors_in_container, ConvertOptions, DType, ParseDtype, Tensor,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Convert {
            input,
            dtype,
            arg_name,
            fn_name,
            no_shape_check,
        } => {
            let parse_as = parse_dtype(&dtype)?;
            let opts = ConvertOptions {
                check_shape_consistency: !no_shape_check,
            };
            convert(&input, parse_as, &arg_name, &fn_name, &opts)
        }
        Command::Walk { input } => walk(&input),
    }
}

fn convert(
    input: &str,
    parse_as: ParseDtype,
    arg_name: &str,
    fn_name: &str,
    opts: &ConvertOptions,
) -> Result<()> {
    let doc = read_json(input)?;
    let like = json::tensor_like_from_json(&doc)?;
    let tensor = convert_to_tensor_with(&like, arg_name, fn_name, parse_as, opts)?;
    println!("{}", describe(&tensor)?);
    Ok(())
}

fn walk(input: &str) -> Result<()> {
    let doc = read_json(input)?;
    let (graph, root) = json::graph_from_json(&doc)?;
    let tensors = get_tensors_in_container(&graph, &root);
    tracing::info!(nodes = graph.len(), tensors = tensors.len(), "walk finished");
    for tensor in &tensors {
        println!("{}", describe(tensor)?);
    }
    Ok(())
}

fn read_json(input: &str) -> Result<serde_json::Value> {
    let text = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else if let Some(path) = input.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?
    } else {
        input.to_string()
    };
    serde_json::from_str(&text).context("input is not valid JSON")
}

fn parse_dtype(raw: &str) -> Result<ParseDtype> {
    ParseDtype::parse(raw).with_context(|| {
        format!("unsupported dtype: {raw} (expected numeric, any, float32, int32, bool or string)")
    })
}

fn describe(tensor: &Tensor) -> Result<String> {
    let values = match tensor.dtype() {
        DType::F32 => format!("{:?}", tensor.to_f32_vec()?),
        DType::I32 => format!("{:?}", tensor.to_i32_vec()?),
        DType::Bool => format!("{:?}", tensor.to_bool_vec()?),
        DType::String => format!("{:?}", tensor.to_string_vec()?),
    };
    Ok(format!(
        "tensor#{} dtype={} shape={} bytes={} values={}",
        tensor.id.0,
        tensor.dtype(),
        tensor.shape(),
        tensor.byte_len,
        values
    ))
}
