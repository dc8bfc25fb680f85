//! Plain-text rendering of view state. Everything here reads panel projections from
//! the core and writes them out; no decisions about what to show are made here.

use std::io::{self, Write};

use protmap_core::panels::error_text;
use protmap_core::payload::{GeneInfo, ImagePayload};
use protmap_core::{
    DownloadsView, DrugView, HomeView, MountedView, PanelView, PathwayView, SearchView,
    SharedPathwaysPanel,
};

pub const PATHWAY_EXPLANATION: &str = "Transcription factor networks come from curated \
MSigDB gene sets. Each protein is scored against the set and only proteins at or above \
the selected threshold are listed; interactions are STRING edges among those proteins.";

fn panel<W, D, F>(out: &mut W, title: &str, view: PanelView<'_, D>, body: F) -> io::Result<()>
where
    W: Write,
    D: ?Sized,
    F: FnOnce(&mut W, &D) -> io::Result<()>,
{
    writeln!(out, "== {title} ==")?;
    match view {
        PanelView::Idle => writeln!(out, "-"),
        PanelView::Loading {
            previous: Some(data),
        } => {
            writeln!(out, "(refreshing)")?;
            body(out, data)
        }
        PanelView::Loading { previous: None } => writeln!(out, "Loading..."),
        PanelView::Empty(message) => writeln!(out, "{message}"),
        PanelView::Error(message) => writeln!(out, "Error: {message}"),
        PanelView::Ready(data) => body(out, data),
    }
}

fn text<W: Write>(out: &mut W, value: &str) -> io::Result<()> {
    writeln!(out, "{value}")
}

fn image<W: Write>(out: &mut W, image: &ImagePayload) -> io::Result<()> {
    writeln!(out, "{}, {} bytes", image.content_type, image.bytes.len())
}

fn gene_info<W: Write>(out: &mut W, info: &GeneInfo) -> io::Result<()> {
    writeln!(out, "{}", info.entity)?;
    for category in &info.categories {
        writeln!(out, "  {}: {}", category.name, category.values.join(", "))?;
    }
    Ok(())
}

pub fn view<W, L>(out: &mut W, view: &MountedView, link: L) -> io::Result<()>
where
    W: Write,
    L: Fn(&str) -> Option<String>,
{
    match view {
        MountedView::Home(view) => home(out, view),
        MountedView::Search(view) => search(out, view),
        MountedView::Pathway(view) => pathway(out, view),
        MountedView::Drug(view) => drug(out, view),
        MountedView::Downloads(view) => downloads(out, view, link),
    }
}

pub fn search<W: Write>(out: &mut W, view: &SearchView) -> io::Result<()> {
    writeln!(out, "# {}", view.key().value())?;
    panel(out, "Group", view.group_label_panel(), text)?;
    panel(out, "Network neighbors", view.network_panel(), |out, _| {
        for row in view.neighbor_rows() {
            let marker = if row.selected { " *" } else { "" };
            writeln!(
                out,
                "{:>3}. {:<14} {:.3}{marker}",
                row.rank, row.entity_id, row.similarity
            )?;
        }
        Ok(())
    })?;
    panel(out, "Description", view.description_panel(), text)?;

    writeln!(out, "== Shared pathways ==")?;
    match view.shared_pathways_panel() {
        SharedPathwaysPanel::Loading => writeln!(out, "Loading...")?,
        SharedPathwaysPanel::Groups(rows) => {
            for row in rows {
                let fold = if row.expanded { '-' } else { '+' };
                writeln!(out, "[{fold}] {} ({})", row.group_label, row.member_count)?;
                for member in row.members {
                    writeln!(out, "      {} {:.3}", member.pathway_id, member.score)?;
                }
            }
        }
        other => writeln!(out, "{}", other.message().unwrap_or_default())?,
    }

    panel(out, "Gene info", view.gene_info_panel(), gene_info)?;
    panel(out, "Flatmap overlays", view.flatmap_overlays_panel(), |out, names| {
        for name in names {
            let marker = if view.flatmap_overlay() == Some(name.as_str()) {
                " *"
            } else {
                ""
            };
            writeln!(out, "  {name}{marker}")?;
        }
        Ok(())
    })?;
    panel(out, "Flatmap", view.flatmap_image_panel(), image)?;
    panel(out, "Calibration", view.calibration_panel(), image)?;
    panel(out, "AUPRC", view.auprc_panel(), image)?;

    writeln!(out, "== Structure ==")?;
    writeln!(
        out,
        "{} ({}px)",
        view.structure_frame_src(),
        view.structure_frame_height()
    )
}

pub fn pathway<W: Write>(out: &mut W, view: &PathwayView) -> io::Result<()> {
    writeln!(out, "# {} (threshold {})", view.key().value(), view.threshold())?;
    if view.show_explanation() {
        writeln!(out, "{PATHWAY_EXPLANATION}")?;
    }
    panel(out, "Description", view.description_panel(), text)?;
    panel(out, "Proteins", view.proteins_panel(), |out, proteins| {
        for protein in proteins {
            let marker = if view.selected_info_entity() == Some(protein.id.as_str()) {
                " *"
            } else {
                ""
            };
            writeln!(out, "  {:<14} {:.3}{marker}", protein.id, protein.score)?;
        }
        Ok(())
    })?;
    panel(out, "Interactions", view.interactions_panel(), |out, edges| {
        for edge in edges {
            writeln!(
                out,
                "  {} - {} {:.3}",
                edge.prediction_entity, edge.geneset_entity, edge.score
            )?;
        }
        Ok(())
    })?;
    panel(out, "Gene info", view.gene_info_panel(), gene_info)
}

pub fn drug<W: Write>(out: &mut W, view: &DrugView) -> io::Result<()> {
    writeln!(out, "# {}", view.key().value())?;
    panel(out, "Description", view.description_panel(), text)
}

pub fn home<W: Write>(out: &mut W, view: &HomeView) -> io::Result<()> {
    writeln!(out, "# search {} \"{}\"", view.kind(), view.input())?;
    if let Some(error) = view.last_error() {
        writeln!(out, "{error}")?;
    }
    if let Some(error) = view.autocomplete().error() {
        return writeln!(out, "Error: {}", error_text(error));
    }
    if view.suggestions().is_empty() {
        return writeln!(out, "No suggestions.");
    }
    for suggestion in view.suggestions() {
        writeln!(out, "  {suggestion}")?;
    }
    Ok(())
}

pub fn downloads<W, L>(out: &mut W, view: &DownloadsView, link: L) -> io::Result<()>
where
    W: Write,
    L: Fn(&str) -> Option<String>,
{
    panel(out, "Downloads", view.files_panel(), |out, files| {
        for file in files {
            writeln!(out, "{}\t{}", file.filename, file.description)?;
            if let Some(url) = link(&file.filename) {
                writeln!(out, "  {url}")?;
            }
        }
        Ok(())
    })
}
