use docgraph_core::{RawEdge, RawGraphPayload, RawNode};

/// A table of contents `depth` levels deep with `fanout` children per chapter,
/// one session per top-level chapter and a cross edge between consecutive
/// siblings.
pub fn synthetic_payload(depth: u32, fanout: usize) -> RawGraphPayload {
    let mut payload = RawGraphPayload::default();
    let mut page = 1;
    let mut frontier = vec![None::<String>];

    for level in 1..=depth {
        let mut next = Vec::new();
        for parent in &frontier {
            let mut previous: Option<String> = None;
            for i in 0..fanout {
                let id = match parent {
                    Some(parent) => format!("{parent}.{i}"),
                    None => format!("ch{i}"),
                };
                payload.nodes.push(
                    RawNode::chapter(id.as_str(), format!("Chapter {id}"), i64::from(level))
                        .with_pages(page, page + 3)
                        .with_bookmark(i % 4 == 0),
                );
                page += 4;

                if let Some(parent) = parent {
                    payload.edges.push(RawEdge::new(parent.as_str(), id.as_str(), 0.8));
                }
                if let Some(previous) = &previous {
                    payload.edges.push(RawEdge::new(previous.as_str(), id.as_str(), 0.2));
                }
                if level == 1 {
                    payload
                        .session_nodes
                        .push(RawNode::session(format!("s-{id}"), id.as_str()));
                }
                previous = Some(id.clone());
                next.push(Some(id));
            }
        }
        frontier = next;
    }
    payload
}
