use kuchiki::NodeRef;

const SKIP_TAGS: &[&str] = &["script", "style", "noscript", "textarea", "code", "pre"];
const MIN_TEXT_LEN: usize = 2;

/// One eligible text node together with the string value it held at
/// extraction time. The engine's reference is non-owning; the document
/// tree keeps the node alive.
#[derive(Debug, Clone)]
pub struct TextSlot {
    pub node: NodeRef,
    pub value: String,
}

/// Collects eligible text nodes from the body subtree in document order.
/// That order is the index space used to re-associate translations, so it
/// must match traversal order exactly.
pub fn collect_text_nodes(document: &NodeRef) -> Vec<TextSlot> {
    let root = body_or_document(document);
    let mut slots = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.as_text() else { continue };
        if parent_is_skipped(&node) {
            continue;
        }
        let value = text.borrow().clone();
        if value.trim().chars().count() < MIN_TEXT_LEN {
            continue;
        }
        slots.push(TextSlot {
            node: node.clone(),
            value,
        });
    }
    slots
}

fn parent_is_skipped(node: &NodeRef) -> bool {
    let Some(parent) = node.parent() else {
        return true;
    };
    let Some(element) = parent.as_element() else {
        return false;
    };
    SKIP_TAGS.contains(&element.name.local.as_ref())
}

fn body_or_document(document: &NodeRef) -> NodeRef {
    document
        .select_first("body")
        .map(|body| body.as_node().clone())
        .unwrap_or_else(|()| document.clone())
}
