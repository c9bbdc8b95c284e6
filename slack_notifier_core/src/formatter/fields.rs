/*!
 * Field builders shared by every formatter.
 *
 * Pure functions from captured data to attachment fields; none of them
 * knows which attachment it ends up in.
 */

use crate::context::{CommandSnapshot, ExecutionContext, ParameterBag, RequestSnapshot};
use crate::protocol::exception::CapturedException;
use crate::protocol::types::Field;

/// Message, environment, code, file and line, plus URI / command when known.
pub fn main_info_fields(
    exception: &CapturedException,
    environment: &str,
    request: Option<&RequestSnapshot>,
    command: Option<&CommandSnapshot>,
) -> Vec<Field> {
    let mut fields = vec![
        Field::long("Message", exception.message.as_str()),
        Field::short("Environment", environment),
        Field::short("Code", exception.code.to_string()),
        Field::short("File", exception.file.as_str()),
        Field::short("Line", exception.line.to_string()),
    ];

    if let Some(request) = request {
        fields.push(Field::long("Uri", format!("<{}>", request.uri)));
    }
    if let Some(command) = command {
        fields.push(Field::long("Command", command.name.as_str()));
    }

    fields
}

pub fn command_option_fields(command: &CommandSnapshot) -> Vec<Field> {
    command
        .options
        .iter()
        .map(|(name, value)| Field::short(format!("Option {name}"), value.as_str()))
        .collect()
}

pub fn command_argument_fields(command: &CommandSnapshot) -> Vec<Field> {
    command
        .arguments
        .iter()
        .map(|(name, value)| Field::short(format!("Argument {name}"), value.as_str()))
        .collect()
}

pub fn context_fields(context: &ExecutionContext) -> Vec<Field> {
    context
        .iter()
        .map(|(name, value)| Field::short(name, value))
        .collect()
}

/// One short field per entry, keys in ascending order.
pub fn bag_fields(bag: &ParameterBag) -> Vec<Field> {
    bag.iter()
        .map(|(key, value)| Field::short(key.as_str(), value.as_str()))
        .collect()
}
