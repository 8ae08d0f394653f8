use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use exam_marking::ExportRequest;

#[tokio::main]
async fn main() -> Result<()> {
    let request = match parse_args(env::args().skip(1)) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("{err:#}");
            eprintln!(
                "usage: export_report --exam-id <id> [--output <path>] [--search <text>] [--section-id <id>]..."
            );
            std::process::exit(2);
        }
    };

    match exam_marking::export_report(request).await {
        Ok(path) => {
            println!("Report written to {}", path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("export_report fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<ExportRequest> {
    let mut exam_id = None;
    let mut request = ExportRequest::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--exam-id" => {
                let value = args.next().ok_or_else(|| anyhow!("--exam-id missing value"))?;
                exam_id = Some(
                    value.parse::<i64>().with_context(|| format!("Invalid exam id: {value}"))?,
                );
            }
            "--output" => {
                let value = args.next().ok_or_else(|| anyhow!("--output missing value"))?;
                request.output = Some(PathBuf::from(value));
            }
            "--search" => {
                request.search = Some(args.next().ok_or_else(|| anyhow!("--search missing value"))?);
            }
            "--section-id" => {
                let value = args.next().ok_or_else(|| anyhow!("--section-id missing value"))?;
                request.section_ids.push(
                    value.parse::<i64>().with_context(|| format!("Invalid section id: {value}"))?,
                );
            }
            _ => return Err(anyhow!("Unknown argument: {arg}")),
        }
    }

    request.exam_id = exam_id.ok_or_else(|| anyhow!("--exam-id is required"))?;
    Ok(request)
}
