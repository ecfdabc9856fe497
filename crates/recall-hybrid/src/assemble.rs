use recall_core::text::{char_len, truncate_chars};
use recall_core::types::{DocId, IncludedDocument, RetrievalContext};
use recall_core::Corpus;

/// Lay out `doc_ids` as labeled blocks within `max_chars` characters.
///
/// Blocks are `--- <file_name> ---\n<content>\n`, separated by a blank line.
/// The first block that does not fit is cut to fill the remaining budget
/// (content cut on a character boundary) and assembly stops there. When even
/// the header of the leading block does not fit, its label is shortened, or
/// dropped, so that some content still goes out.
pub fn assemble(doc_ids: &[DocId], corpus: &Corpus, max_chars: usize) -> RetrievalContext {
    let mut ctx = RetrievalContext { total_documents: doc_ids.len(), ..RetrievalContext::default() };
    let mut used = 0usize;

    for id in doc_ids {
        let Some(doc) = corpus.get(id) else { continue };
        let separator = if ctx.context.is_empty() { "" } else { "\n" };
        let header = format!("{separator}--- {} ---\n", doc.file_name);
        let header_chars = char_len(&header);
        let content_chars = doc.char_len();
        let block_chars = header_chars + content_chars + 1;
        let remaining = max_chars.saturating_sub(used);

        if block_chars <= remaining {
            ctx.context.push_str(&header);
            ctx.context.push_str(&doc.content);
            ctx.context.push('\n');
            used += block_chars;
            ctx.documents.push(IncludedDocument { doc_id: doc.id.clone(), file_name: doc.file_name.clone(), chars: content_chars, truncated: false });
            continue;
        }

        ctx.truncated = true;
        let header = if remaining > header_chars {
            header
        } else if ctx.context.is_empty() {
            compact_header(&doc.file_name, remaining)
        } else {
            break;
        };
        let header_chars = char_len(&header);
        let cut = truncate_chars(&doc.content, remaining - header_chars);
        if !cut.is_empty() {
            ctx.context.push_str(&header);
            ctx.context.push_str(cut);
            used += header_chars + char_len(cut);
            ctx.documents.push(IncludedDocument { doc_id: doc.id.clone(), file_name: doc.file_name.clone(), chars: char_len(cut), truncated: true });
        }
        break;
    }

    ctx.total_chars = used;
    ctx.documents_included = ctx.documents.len();
    ctx.message = if ctx.documents_included == 0 && ctx.total_documents == 0 {
        "0 documents matched above threshold".to_string()
    } else if ctx.documents_included == 0 {
        format!("{} documents matched but none fit within {} chars", ctx.total_documents, max_chars)
    } else {
        format!(
            "assembled {} of {} matching documents ({} chars{})",
            ctx.documents_included,
            ctx.total_documents,
            ctx.total_chars,
            if ctx.truncated { ", truncated to budget" } else { "" }
        )
    };
    tracing::debug!(included = ctx.documents_included, total = ctx.total_documents, chars = ctx.total_chars, truncated = ctx.truncated, "context assembled");
    ctx
}

/// A header of at most half of `budget` chars; empty when no label fits.
fn compact_header(file_name: &str, budget: usize) -> String {
    let name_room = (budget / 2).saturating_sub("---  ---\n".len());
    if name_room == 0 { return String::new(); }
    format!("--- {} ---\n", truncate_chars(file_name, name_room))
}
