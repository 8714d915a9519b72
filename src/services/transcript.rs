use crate::models::{Conversation, Role};

/// Render a conversation as a markdown transcript.
pub fn to_markdown(conversation: &Conversation) -> String {
    let mut output = format!("# {}\n\n", conversation.title);
    output.push_str(&format!(
        "> Started: {}\n\n",
        conversation.created_at.format("%Y-%m-%d %H:%M")
    ));
    output.push_str("---\n\n");

    for message in &conversation.messages {
        let role_label = match message.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        output.push_str(&format!("### {}\n\n{}\n\n", role_label, message.content));
    }

    output
}
