//! 终端命令解析
//!
//! 终端模式下考生通过标准输入操作考试：
//!
//! ```text
//! answer <题目ID> <A-D>   作答（重复作答会覆盖）
//! submit                  交卷
//! status                  查看剩余时间和违规次数
//! questions               列出题目
//! quit                    离开考试页面（不交卷）
//! ```

use crate::models::OptionLabel;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Answer {
        question_id: String,
        option: OptionLabel,
    },
    Submit,
    Status,
    Questions,
    Quit,
    Empty,
}

pub struct ConsoleParser {
    answer: Regex,
}

impl ConsoleParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            answer: Regex::new(r"^(?i:answer)\s+(\S+)\s+([A-Da-d])$")?,
        })
    }

    /// 解析一行输入，无法识别时返回提示文本
    pub fn parse(&self, line: &str) -> Result<ConsoleCommand, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(ConsoleCommand::Empty);
        }

        if let Some(caps) = self.answer.captures(line) {
            let option = caps[2].parse::<OptionLabel>().map_err(|e| e.to_string())?;
            return Ok(ConsoleCommand::Answer {
                question_id: caps[1].to_string(),
                option,
            });
        }

        match line.to_ascii_lowercase().as_str() {
            "submit" => Ok(ConsoleCommand::Submit),
            "status" => Ok(ConsoleCommand::Status),
            "questions" => Ok(ConsoleCommand::Questions),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            _ => Err(format!(
                "无法识别的命令: {}（可用: answer <题目ID> <A-D> | submit | status | questions | quit）",
                line
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ConsoleParser {
        ConsoleParser::new().unwrap()
    }

    #[test]
    fn parses_answers_in_any_case() {
        assert_eq!(
            parser().parse("answer Q1 b").unwrap(),
            ConsoleCommand::Answer {
                question_id: "Q1".to_string(),
                option: OptionLabel::B
            }
        );
        assert_eq!(
            parser().parse("  ANSWER 42 D ").unwrap(),
            ConsoleCommand::Answer {
                question_id: "42".to_string(),
                option: OptionLabel::D
            }
        );
    }

    #[test]
    fn parses_keywords() {
        let p = parser();
        assert_eq!(p.parse("submit").unwrap(), ConsoleCommand::Submit);
        assert_eq!(p.parse("Status").unwrap(), ConsoleCommand::Status);
        assert_eq!(p.parse("questions").unwrap(), ConsoleCommand::Questions);
        assert_eq!(p.parse("exit").unwrap(), ConsoleCommand::Quit);
        assert_eq!(p.parse("   ").unwrap(), ConsoleCommand::Empty);
    }

    #[test]
    fn rejects_out_of_range_options_and_unknown_input() {
        let p = parser();
        assert!(p.parse("answer Q1 E").is_err());
        assert!(p.parse("answer Q1").is_err());
        assert!(p.parse("dance").is_err());
    }
}
