use super::types::Chat;

/// One place an operator identity may be recorded on a chat.
pub struct OperatorField {
    pub name: &'static str,
    pub extract: fn(&Chat) -> Option<&str>,
}

/// Fields consulted in order; the first non-blank value wins.
/// `accepted_by` comes first because attribution follows chat acceptance.
pub const OPERATOR_FIELDS: &[OperatorField] = &[
    OperatorField {
        name: "acceptedBy",
        extract: |c| c.accepted_by.as_deref(),
    },
    OperatorField {
        name: "operator",
        extract: |c| c.operator.as_deref(),
    },
    OperatorField {
        name: "assignedTo",
        extract: |c| c.assigned_to.as_deref(),
    },
];

pub fn resolve_operator(chat: &Chat) -> Option<&str> {
    resolve_with(OPERATOR_FIELDS, chat)
}

pub fn resolve_with<'a>(fields: &[OperatorField], chat: &'a Chat) -> Option<&'a str> {
    for field in fields {
        let Some(value) = (field.extract)(chat).map(str::trim) else {
            continue;
        };
        if !value.is_empty() {
            tracing::trace!("chat {} attributed to {value} via {}", chat.chat_id, field.name);
            return Some(value);
        }
    }
    None
}
