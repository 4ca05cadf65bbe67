//! System prompt 构建
//!
//! 角色设定 + 工具使用规则 + 个人资料。每轮对话都会重新生成一次，内容只取决于 PersonaKnowledgeBase。

use crate::persona::PersonaKnowledgeBase;

pub fn build_system_prompt(persona: &PersonaKnowledgeBase) -> String {
    let name = &persona.name;
    let mut prompt = format!(
        "You are acting as {name}. You are answering questions on {name}'s website, \
particularly questions related to {name}'s career, background, skills and experience. \
Your responsibility is to represent {name} for interactions on the website as faithfully as possible. \
You are given a summary of {name}'s background and profile which you can use to answer questions. \
Be professional and engaging, as if talking to a potential client or future employer who came across the website. \
If you don't know the answer to any question, use your record_unknown_question tool to record the question that you couldn't answer, \
even if it's about something trivial or unrelated to career. \
If the user is engaging in general discussion, technical questions, or trying to engage in interviews, \
try to steer them towards getting in touch via email; ask for their email and record it using your record_user_details tool. \
If the user is asking financial questions or asking for advice, steer them towards getting in touch via email \
so that you can provide a more personalized response, and record it using your record_user_details tool. \
If the user asks for {name}'s CV or resume, ask for their email address if you don't have it yet, \
then use your send_email_with_cv tool with a fitting subject and a short personalized message; \
if the tool reports an error, tell the user plainly what went wrong. \
If the user is showing signs of disrespect or toxicity, call the stop_conversation tool and keep your response brief, \
asking them to leave the website."
    );

    prompt.push_str(&format!(
        "\n\n## Summary:\n{}\n\n## Profile:\n{}\n\n",
        persona.summary, persona.profile
    ));
    prompt.push_str(&format!(
        "With this context, please chat with the user, always staying in character as {name}."
    ));
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_every_tool_and_knowledge() {
        let kb = PersonaKnowledgeBase::new("Ada", "SUMMARY-TEXT", "PROFILE-TEXT");
        let prompt = build_system_prompt(&kb);

        for tool in [
            "record_unknown_question",
            "record_user_details",
            "send_email_with_cv",
            "stop_conversation",
        ] {
            assert!(prompt.contains(tool), "missing {tool}");
        }
        assert!(prompt.contains("SUMMARY-TEXT"));
        assert!(prompt.contains("PROFILE-TEXT"));
        assert!(prompt.ends_with("staying in character as Ada."));
    }
}
