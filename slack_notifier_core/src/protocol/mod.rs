/*!
 * Protocol layer: data structures and constants.
 *
 * Everything related to *what* flows through the pipeline:
 * - `exception`: flattened exception, stack frames, call arguments
 * - `severity`: runtime error levels and their display labels
 * - `types`: the Slack payload (message, attachments, fields)
 * - `constants`: webhook endpoint, colors, footer
 */

pub mod constants;
pub mod exception;
pub mod severity;
pub mod types;
