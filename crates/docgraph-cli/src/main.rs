use anyhow::{Context, Result, bail};
use clap::Parser;
use docgraph_app::{
    Activation, Collaborators, InlineExecutor, LoadState, LoggingBookmarkSink, NoDocuments,
    StaticGraphSource, WorkspaceController, WorkspaceSettings,
};
use docgraph_core::{DocumentId, NodeId, RawGraphPayload};
use docgraph_events::ActivationOrigin;
use docgraph_search::LevelThreshold;
use docgraph_workspace::TabLayoutSnapshot;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Graph payload (JSON) to lay out
    payload: PathBuf,

    /// Document id the payload belongs to
    #[arg(long, default_value = "document")]
    document: String,

    /// Settings file; defaults to the user config directory
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Only show bookmarked chapters and their sessions
    #[arg(long)]
    bookmarked_only: bool,

    /// Highlight nodes whose name contains this text
    #[arg(short, long)]
    query: Option<String>,

    /// Deepest chapter level to show
    #[arg(long)]
    level: Option<u32>,

    /// Layout ticks to run before rendering
    #[arg(long, default_value_t = 300)]
    max_ticks: usize,

    /// Fit the view to the laid-out graph
    #[arg(long)]
    fit: bool,

    /// Node ids to activate, in order
    #[arg(long)]
    click: Vec<String>,

    /// Tab layout file, restored on start and saved on exit
    #[arg(long)]
    tabs: Option<PathBuf>,

    /// Write the scene as JSON here instead of printing a summary
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let content = std::fs::read_to_string(&args.payload)
        .with_context(|| format!("reading graph payload {:?}", args.payload))?;
    let payload: RawGraphPayload = serde_json::from_str(&content)
        .with_context(|| format!("parsing graph payload {:?}", args.payload))?;
    tracing::info!(
        "Loaded {} chapters and {} sessions from {:?}",
        payload.nodes.len(),
        payload.session_nodes.len(),
        args.payload
    );

    let mut settings = WorkspaceSettings::load_or_default(args.settings.as_deref());
    if args.bookmarked_only {
        settings.filter.bookmarked_only = true;
    }
    if let Some(level) = args.level {
        settings.filter.level_threshold = LevelThreshold::UpTo(level);
    }

    let document_id = DocumentId::from(args.document.as_str());
    let source = StaticGraphSource::new().with(document_id.clone(), payload);
    let mut controller = WorkspaceController::new(
        Collaborators::new(source, NoDocuments, LoggingBookmarkSink),
        InlineExecutor,
        settings,
    );

    controller.select_document(document_id);
    controller.pump();
    if let LoadState::Unavailable(reason) = controller.graph_state() {
        bail!("graph unavailable: {reason}");
    }
    for diagnostic in controller.graph().diagnostics() {
        eprintln!("warning: {}", diagnostic);
    }

    if let Some(query) = &args.query {
        let matches = controller.set_search_query(query);
        println!("Search {:?}: {} matches", query, matches);
    }

    let mut ticks = 0;
    while ticks < args.max_ticks && controller.tick() {
        ticks += 1;
    }
    if args.fit {
        controller.zoom_to_fit();
    }

    if let Some(path) = &args.tabs
        && path.exists()
        && !controller.restore_layout(&TabLayoutSnapshot::load(path)?)
    {
        eprintln!("Tab layout {:?} belongs to another document, not restored", path);
    }
    for id in &args.click {
        match controller.activate_node(&NodeId::from(id.as_str()), ActivationOrigin::Graph) {
            Some(Activation::Document { page, created, .. }) => {
                println!("{id}: page {page} ({})", if created { "new tab" } else { "focused" });
            }
            Some(Activation::Session {
                session_id,
                created,
                ..
            }) => {
                println!(
                    "{id}: session {session_id} ({})",
                    if created { "new tab" } else { "focused" }
                );
            }
            None => eprintln!("Unknown node: {}", id),
        }
    }
    if let Some(path) = &args.tabs {
        controller.snapshot_layout().save(path)?;
    }

    let scene = controller.scene();
    match &args.output {
        Some(path) => {
            std::fs::write(path, serde_json::to_string_pretty(&scene)?)?;
            println!("Scene written to {:?}", path);
        }
        None => {
            let settled = controller
                .simulation()
                .is_some_and(|sim| sim.is_settled());
            println!(
                "Graph: {} nodes, {} edges",
                controller.graph().node_count(),
                controller.graph().edge_count()
            );
            println!("Layout: {} ticks, settled = {}", ticks, settled);
            println!(
                "Scene: {} nodes drawn, {} labelled, scale {:.3}",
                scene.nodes.len(),
                scene.labelled().count(),
                scene.transform.scale
            );
            println!(
                "Tabs: {} document, {} session",
                controller.store().documents().len(),
                controller.store().sessions().len()
            );
        }
    }

    Ok(())
}
