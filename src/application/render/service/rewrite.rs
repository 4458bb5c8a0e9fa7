use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use syntect::parsing::SyntaxSet;
use tracing::warn;

use super::highlight;

#[derive(Debug, Default)]
pub(crate) struct RewriteOutcome {
    pub(crate) code_blocks: usize,
    pub(crate) degraded_blocks: usize,
}

/// Replace every code block with pre-highlighted HTML. Blocks whose
/// highlighting fails keep comrak's plain escaped rendering.
pub(crate) fn rewrite_ast<'a>(root: &'a AstNode<'a>, syntax_set: &SyntaxSet) -> RewriteOutcome {
    let mut walker = RewriteWalker::new(syntax_set);
    walker.visit_nodes(root);
    walker.outcome
}

struct RewriteWalker<'a> {
    syntax_set: &'a SyntaxSet,
    outcome: RewriteOutcome,
}

impl<'a> RewriteWalker<'a> {
    fn new(syntax_set: &'a SyntaxSet) -> Self {
        Self {
            syntax_set,
            outcome: RewriteOutcome::default(),
        }
    }

    fn visit_nodes(&mut self, node: &AstNode<'_>) {
        if let Some((info, literal)) = extract_code_block(node) {
            let mut segments = info.split_whitespace();
            let language = segments.next();
            let meta = segments.collect::<Vec<_>>().join(" ");
            let syntax = highlight::resolve_fence_lexer(self.syntax_set, language);

            self.outcome.code_blocks += 1;
            match highlight::highlight_code(self.syntax_set, syntax, &literal) {
                Ok(body) => {
                    let meta_ref = (!meta.is_empty()).then_some(meta.as_str());
                    let html = highlight::wrap_code_block(syntax, meta_ref, &body);
                    let mut data = node.data.borrow_mut();
                    data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                        block_type: 0,
                        literal: html,
                    });
                }
                Err(err) => {
                    self.outcome.degraded_blocks += 1;
                    warn!(
                        target = "application::render::rewrite",
                        language = language.unwrap_or("text"),
                        error = %err,
                        "code block left unhighlighted"
                    );
                }
            }
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.visit_nodes(next);
            child = next.next_sibling();
        }
    }
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        let info = block.info.trim().to_string();
        let literal = block.literal.clone();
        Some((info, literal))
    } else {
        None
    }
}
