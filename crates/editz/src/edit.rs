use std::path::{Path, PathBuf};

use editz_core::edit::EditPlan;
use editz_core::span::SpanKey;

use crate::prelude::{eprintln, println, *};

#[derive(Debug, Clone, clap::Args)]
pub struct EditOptions {
    /// Path to the PDF file
    pub path: PathBuf,

    /// Span to replace (e.g., "text_item_3", see `editz extract`)
    #[arg(short, long)]
    pub key: String,

    /// Replacement text
    #[arg(short, long)]
    pub text: String,

    /// Output file path (defaults to `<name>_edited.pdf` next to the input)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(options: EditOptions, global: crate::Global) -> Result<()> {
    let (plan, output) = tokio::task::spawn_blocking({
        let options = options.clone();
        move || edit_file(&options)
    })
    .await??;

    if global.verbose {
        eprintln!(
            "{}: '{}' -> '{}' ({})",
            plan.key, plan.old_text, plan.new_text, plan.decision.reasoning
        );
    }

    println!("{}", serde_json::to_string_pretty(&plan)?);
    eprintln!("Wrote {}", output.display());

    Ok(())
}

/// Extract, plan, apply and write. Returns the plan and the written path.
pub fn edit_file(options: &EditOptions) -> Result<(EditPlan, PathBuf)> {
    let key = SpanKey::parse(&options.key).map_err(|e| eyre!("{}: {}", e, options.key))?;
    let bytes = read_pdf(&options.path)?;

    let document = pdf::extract(&bytes).map_err(|e| eyre!(e))?;
    document
        .spans
        .get(&key)
        .ok_or_eyre(format!("Text item '{}' not found in {}", key, options.path.display()))?;

    let (plan, edited) =
        pdf::edit(&bytes, key, &options.text, document.spans).map_err(|e| eyre!(e))?;

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| default_output(&options.path));
    std::fs::write(&output, edited)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    Ok((plan, output))
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{stem}_edited.pdf"))
}
