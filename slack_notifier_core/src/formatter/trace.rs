/**
 * Stack trace rendering.
 *
 * Every frame of every exception in the chain becomes one field, numbered
 * from 0 again for each exception:
 *
 * ```text
 * title: 0. at App\Repo\UserRepo -> find in src/Repo/UserRepo.php at line 42
 * value: >'42'  (one line per argument)
 *        ```source excerpt```
 * ```
 *
 * Arguments are rendered as markdown blockquote lines ending in two spaces,
 * so Slack breaks the line without starting a new paragraph.
 */
use std::path::Path;

use super::source::{display_location, file_excerpt};
use crate::protocol::exception::{ArgumentDescriptor, ArrayEntry, ArrayKey, CapturedException, StackFrame};
use crate::protocol::types::Field;

/// Excerpt sizes for the first located frame and for all frames after it.
#[derive(Debug, Clone, Copy)]
pub struct ExcerptPadding {
    pub first: usize,
    pub following: usize,
}

/**
 * Builds one field per frame, walking the exception chain outermost first.
 *
 * The first frame with a known file and line gets `padding.first` lines of
 * context on each side, every later one (in any exception) `padding.following`.
 */
pub fn full_trace_fields(
    exception: &CapturedException,
    padding: ExcerptPadding,
    root_dir: Option<&Path>,
) -> Vec<Field> {
    let mut current_padding = padding.first;
    let mut fields = Vec::new();

    for link in exception.chain() {
        for (index, frame) in link.trace.iter().enumerate() {
            let mut title = frame_title(index, frame);
            let mut value = String::new();

            if !frame.arguments.is_empty() {
                value.push_str(&render_arguments(&frame.arguments));
                value.push('\n');
            }

            if let Some((file, line)) = frame.location() {
                title.push_str(" in ");
                title.push_str(&display_location(file, line, root_dir));
                if let Some(excerpt) = file_excerpt(Path::new(file), line, current_padding) {
                    value.push_str(&excerpt);
                }
                current_padding = padding.following;
            }

            fields.push(Field::long(title, value));
        }
    }

    fields
}

fn frame_title(index: usize, frame: &StackFrame) -> String {
    match &frame.class_name {
        Some(class) if !class.is_empty() => {
            let call = frame.call_type.map(|c| c.as_str()).unwrap_or("->");
            format!("{index}. at {class} {call} {}", frame.function_name)
        }
        _ => format!("{index}. {}", frame.function_name),
    }
}

/// Renders positional call arguments, one blockquote line each.
pub fn render_arguments(arguments: &[ArgumentDescriptor]) -> String {
    arguments
        .iter()
        .map(|argument| render_line(None, argument))
        .collect()
}

fn render_entries(entries: &[ArrayEntry]) -> String {
    entries
        .iter()
        .map(|entry| match &entry.key {
            ArrayKey::Index(_) => render_line(None, &entry.value),
            ArrayKey::Name(name) => render_line(Some(name.as_str()), &entry.value),
        })
        .collect()
}

fn render_line(key: Option<&str>, value: &ArgumentDescriptor) -> String {
    let rendered = render_value(value);
    match key {
        Some(key) => format!(">'{key}' => {rendered}  \n"),
        None => format!(">{rendered}  \n"),
    }
}

fn render_value(value: &ArgumentDescriptor) -> String {
    match value {
        ArgumentDescriptor::Object(type_name) => format!("*object* ({type_name})"),
        ArgumentDescriptor::Array(entries) => format!("*array* ({})", render_entries(entries)),
        ArgumentDescriptor::String(s) => format!("'{s}'"),
        ArgumentDescriptor::Null => "null".to_string(),
        ArgumentDescriptor::Boolean(b) => b.to_string(),
        ArgumentDescriptor::Resource => "resource".to_string(),
        ArgumentDescriptor::Other(s) => s.replace('\n', ""),
    }
}
