use super::error::Error;

const CURRENT_STREAM: &str = "current";

/// Inline button payload, encoded as `<command>=<parameter>`. Buttons of a
/// now-playing message carry the episode they were built for, so a press on
/// an older message can be told apart from the open stream.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// `nav=<prev|next>:<episode>`
    Navigate(Direction, u64),
    /// `mark_seen=<episode>`, or `mark_seen=current` for a stream without
    /// episodes.
    MarkSeen(Option<u64>),
    ClearHistory(ClearHistoryOption),
}

impl Command {
    fn from(command: &str, parameter: &str) -> Result<Command, Error> {
        match command {
            "nav" => {
                let Some((direction, episode)) = parameter.split_once(':') else {
                    return Err(Error::CallbackCommandParseError(format!(
                        "expected <direction>:<episode>: parameter={parameter}"
                    )));
                };
                Ok(Command::Navigate(
                    Direction::from(direction)?,
                    parse_episode(episode)?,
                ))
            }
            "mark_seen" => match parameter {
                CURRENT_STREAM => Ok(Command::MarkSeen(None)),
                episode => parse_episode(episode).map(|episode| Command::MarkSeen(Some(episode))),
            },
            "clear_history" => ClearHistoryOption::from(parameter).map(Command::ClearHistory),
            _ => Err(Error::CallbackCommandParseError(format!(
                "unknown command: command={command}"
            ))),
        }
    }

    pub fn from_data_string(data: &str) -> Result<Command, Error> {
        let splitted: Vec<&str> = data.split('=').collect();

        if splitted.len() != 2 {
            return Err(Error::CallbackCommandParseError(format!(
                "expected <command>=<parameter>: data={data}"
            )));
        }

        Self::from(splitted[0], splitted[1])
    }

    pub fn to_data_string(&self) -> String {
        match self {
            Command::Navigate(Direction::Previous, episode) => format!("nav=prev:{episode}"),
            Command::Navigate(Direction::Next, episode) => format!("nav=next:{episode}"),
            Command::MarkSeen(Some(episode)) => format!("mark_seen={episode}"),
            Command::MarkSeen(None) => format!("mark_seen={CURRENT_STREAM}"),
            Command::ClearHistory(ClearHistoryOption::No) => String::from("clear_history=no"),
            Command::ClearHistory(ClearHistoryOption::Yes) => String::from("clear_history=yes"),
        }
    }

    /// Episode the button was built for. `None` for buttons that do not act
    /// on a stream.
    pub fn stream_episode(&self) -> Option<Option<u64>> {
        match self {
            Command::Navigate(_, episode) => Some(Some(*episode)),
            Command::MarkSeen(episode) => Some(*episode),
            Command::ClearHistory(_) => None,
        }
    }
}

fn parse_episode(episode: &str) -> Result<u64, Error> {
    episode.parse().map_err(|_| {
        Error::CallbackCommandParseError(format!("invalid episode: episode={episode}"))
    })
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    fn from(direction: &str) -> Result<Direction, Error> {
        match direction {
            "prev" => Ok(Direction::Previous),
            "next" => Ok(Direction::Next),
            _ => Err(Error::CallbackCommandParseError(format!(
                "unknown direction: direction={direction}"
            ))),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ClearHistoryOption {
    No,
    Yes,
}

impl ClearHistoryOption {
    fn from(option: &str) -> Result<ClearHistoryOption, Error> {
        match option.to_lowercase().as_str() {
            "no" => Ok(ClearHistoryOption::No),
            "yes" => Ok(ClearHistoryOption::Yes),
            _ => Err(Error::CallbackCommandParseError(format!(
                "unknown option for ClearHistory: option={option}"
            ))),
        }
    }
}
