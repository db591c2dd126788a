//! Markdown task lists rendered as Confluence task lists.

use std::sync::LazyLock;

use regex::Regex;

use crate::markup::escape_xml;

/// List item with a checkbox. Each four spaces or tab of indent is one
/// nesting level.
static TASK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>(?:    |\t)*) {0,3}(?:[-+*]|\d+\.)[ \t]*(?P<check>\[ \]|\[x\])(?P<text>.*)$")
        .expect("invalid task regex")
});

#[derive(Debug)]
struct Task {
    id: usize,
    text: String,
    complete: bool,
    children: Vec<Task>,
}

impl Task {
    fn render(&self, out: &mut String) {
        let status = if self.complete { "complete" } else { "incomplete" };
        out.push_str("<ac:task>");
        out.push_str(&format!("<ac:task-id>{}</ac:task-id>", self.id));
        out.push_str(&format!("<ac:task-status>{status}</ac:task-status>"));
        out.push_str("<ac:task-body>");
        out.push_str(&format!(
            r#"<span class="placeholder-inline-tasks">{}</span>"#,
            escape_xml(&self.text, false)
        ));
        if !self.children.is_empty() {
            render_list(&self.children, out);
        }
        out.push_str("</ac:task-body></ac:task>");
    }
}

fn render_list(tasks: &[Task], out: &mut String) {
    out.push_str("<ac:task-list>");
    for task in tasks {
        task.render(out);
    }
    out.push_str("</ac:task-list>");
}

/// Attach a task `level` steps below the top of `list`.
///
/// A level deeper than the tree so far attaches below the last task.
fn insert(list: &mut Vec<Task>, task: Task, level: usize) {
    if level == 0 {
        list.push(task);
        return;
    }
    match list.last_mut() {
        None => list.push(task),
        Some(last) if last.children.is_empty() => last.children.push(task),
        Some(last) => insert(&mut last.children, task, level - 1),
    }
}

/// Replace task lists with `ac:task-list` markup wrapped in raw blocks.
///
/// A task list starts at the beginning of the text or after a blank line
/// and runs while lines are task items. Task ids are numbered from 1 in
/// document order.
#[must_use]
pub fn process_task_lists(source: &str) -> String {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut next_id = 1;
    let mut i = 0;

    while i < lines.len() {
        let starts_block = i == 0 || lines[i - 1].is_empty();
        if starts_block {
            let mut tasks = Vec::new();
            let mut consumed = 0;
            for line in &lines[i..] {
                let Some(caps) = TASK_RE.captures(line) else {
                    break;
                };
                let level = count_levels(&caps["indent"]);
                let task = Task {
                    id: next_id,
                    text: caps["text"].trim().to_owned(),
                    complete: &caps["check"] == "[x]",
                    children: Vec::new(),
                };
                next_id += 1;
                insert(&mut tasks, task, level);
                consumed += 1;
            }
            if consumed > 0 {
                tracing::debug!(items = consumed, "Found task list");
                let mut rendered = String::from("<raw_confluence>");
                render_list(&tasks, &mut rendered);
                rendered.push_str("</raw_confluence>");
                out.push(rendered);
                i += consumed;
                continue;
            }
        }
        out.push(lines[i].to_owned());
        i += 1;
    }

    out.join("\n")
}

fn count_levels(indent: &str) -> usize {
    let tabs = indent.matches('\t').count();
    tabs + (indent.len() - tabs) / 4
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn task(id: usize, status: &str, text: &str, children: &str) -> String {
        format!(
            concat!(
                "<ac:task><ac:task-id>{}</ac:task-id><ac:task-status>{}</ac:task-status>",
                r#"<ac:task-body><span class="placeholder-inline-tasks">{}</span>{}"#,
                "</ac:task-body></ac:task>"
            ),
            id, status, text, children
        )
    }

    #[test]
    fn test_flat_task_list() {
        let result = process_task_lists("- [ ] write docs\n- [x] ship\n");

        assert_eq!(
            result,
            format!(
                "<raw_confluence><ac:task-list>{}{}</ac:task-list></raw_confluence>\n",
                task(1, "incomplete", "write docs", ""),
                task(2, "complete", "ship", ""),
            )
        );
    }

    #[test]
    fn test_nested_task_list() {
        let result = process_task_lists("* [ ] parent\n    * [x] child\n\t\t* [ ] grandchild\n* [ ] next");

        let grandchild = format!(
            "<ac:task-list>{}</ac:task-list>",
            task(3, "incomplete", "grandchild", "")
        );
        let child = format!(
            "<ac:task-list>{}</ac:task-list>",
            task(2, "complete", "child", &grandchild)
        );
        assert_eq!(
            result,
            format!(
                "<raw_confluence><ac:task-list>{}{}</ac:task-list></raw_confluence>",
                task(1, "incomplete", "parent", &child),
                task(4, "incomplete", "next", ""),
            )
        );
    }

    #[test]
    fn test_task_list_requires_blank_line_before() {
        let source = "Paragraph\n- [ ] not a task list\n";

        assert_eq!(process_task_lists(source), source);
    }

    #[test]
    fn test_task_list_after_paragraph_and_ids_continue() {
        let result = process_task_lists("- [ ] a\n\nText\n\n1. [x] b\n");

        assert_eq!(
            result,
            format!(
                concat!(
                    "<raw_confluence><ac:task-list>{}</ac:task-list></raw_confluence>\n",
                    "\nText\n\n",
                    "<raw_confluence><ac:task-list>{}</ac:task-list></raw_confluence>\n",
                ),
                task(1, "incomplete", "a", ""),
                task(2, "complete", "b", ""),
            )
        );
    }

    #[test]
    fn test_task_text_is_escaped() {
        let result = process_task_lists("- [ ] a < b & c");

        assert!(result.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_plain_list_untouched() {
        let source = "- one\n- two\n";

        assert_eq!(process_task_lists(source), source);
    }
}
