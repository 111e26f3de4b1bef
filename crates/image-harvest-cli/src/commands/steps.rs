use serde::Serialize;

use image_harvest::StepKind;

use super::Context;

#[derive(Debug, Serialize)]
struct StepInfo {
    id: &'static str,
    name: &'static str,
    description: &'static str,
}

/// List the standard step registry.
pub fn steps(ctx: &Context) -> anyhow::Result<()> {
    let steps: Vec<StepInfo> = StepKind::ALL
        .iter()
        .map(|k| StepInfo {
            id: k.id(),
            name: k.name(),
            description: k.description(),
        })
        .collect();

    ctx.emit(&steps, || {
        steps
            .iter()
            .map(|s| format!("{:>2}  {:<13} {}", s.id, s.name, s.description))
            .collect::<Vec<_>>()
            .join("\n")
    })
}
