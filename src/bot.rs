mod callback;
mod error;

use crate::{
    application::{self, Application, EpisodeInfo, UserID, validation},
    storage::models::PlaybackHistory,
};
use callback::{ClearHistoryOption, Direction};
use std::sync::Arc;
use teloxide::{
    dispatching::UpdateHandler,
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, MenuButton},
    utils::command::BotCommands,
};

type Error = Box<dyn std::error::Error + Send + Sync>;
type HandlerResult = Result<(), Error>;

const HISTORY_PAGE_SIZE: usize = 10;
const STALE_BUTTON_TEXT: &str = "This message is about another stream, open it again to use its buttons";

/// I find the episode number in HLS stream links and build links to the
/// neighbouring episodes.
///
/// Send me a .m3u8 link, or use:
#[derive(BotCommands, Clone)]
#[command(rename_rule = "snake_case")]
enum Command {
    #[command(hide)]
    Start,
    /// Show this help.
    Help,
    /// Show recently watched streams.
    History,
    /// Forget watched streams.
    ClearHistory,
    /// Continue the last stream.
    Resume,
    /// Toggle opening the next episode automatically.
    AutoNext,
}

pub async fn new(
    bot_token: String,
    application: Arc<Application>,
) -> Result<Dispatcher<Bot, Error, teloxide::dispatching::DefaultKey>, teloxide::RequestError> {
    let bot = Bot::new(bot_token);

    bot.set_chat_menu_button()
        .menu_button(MenuButton::Commands)
        .send()
        .await?;
    bot.set_my_commands(Command::bot_commands()).send().await?;

    Ok(Dispatcher::builder(bot, build_handler())
        .dependencies(dptree::deps![application])
        .default_handler(|upd| async move {
            log::warn!("Unhandled update: id={}", upd.id.0);
        })
        .enable_ctrlc_handler()
        .build())
}

fn build_handler() -> UpdateHandler<Error> {
    use dptree::case;

    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .branch(case![Command::Start].endpoint(help_handler))
                .branch(case![Command::Help].endpoint(help_handler))
                .branch(case![Command::History].endpoint(history_handler))
                .branch(case![Command::ClearHistory].endpoint(clear_history_handler))
                .branch(case![Command::Resume].endpoint(resume_handler))
                .branch(case![Command::AutoNext].endpoint(auto_next_handler)),
        )
        .branch(Update::filter_callback_query().endpoint(callback_handler))
        .branch(Update::filter_message().endpoint(message_handler))
}

async fn help_handler(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;

    Ok(())
}

async fn history_handler(bot: Bot, msg: Message, application: Arc<Application>) -> HandlerResult {
    let Some(user_id) = message_user_id(&msg) else {
        return Ok(());
    };

    let mut player = application.open_player(user_id)?;
    let history = player.storage().playback_history()?;

    bot.send_message(msg.chat.id, build_history_text(&history))
        .await?;

    Ok(())
}

async fn clear_history_handler(bot: Bot, msg: Message) -> HandlerResult {
    let keyboard = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(
            "Yes, clear",
            callback::Command::ClearHistory(ClearHistoryOption::Yes).to_data_string(),
        ),
        InlineKeyboardButton::callback(
            "No",
            callback::Command::ClearHistory(ClearHistoryOption::No).to_data_string(),
        ),
    ]]);

    bot.send_message(msg.chat.id, "Clear the whole watch history?")
        .reply_markup(keyboard)
        .await?;

    Ok(())
}

async fn resume_handler(bot: Bot, msg: Message, application: Arc<Application>) -> HandlerResult {
    let Some(user_id) = message_user_id(&msg) else {
        return Ok(());
    };

    let mut player = application.open_player(user_id)?;
    let current_time = match player.restore_session() {
        Ok((_, current_time)) => current_time,
        Err(application::error::Error::NothingToRestore) => {
            bot.send_message(msg.chat.id, application::error::Error::NothingToRestore.to_string())
                .await?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let url = player.current_url().unwrap_or_default();
    let mut text = build_now_playing_text(url, player.current_episode());
    if current_time > 0.0 {
        text.push_str(&format!("\nResume at {}", format_position(current_time)));
    }

    bot.send_message(msg.chat.id, text)
        .reply_markup(build_navigation_keyboard(player.current_episode()))
        .await?;

    Ok(())
}

async fn auto_next_handler(bot: Bot, msg: Message, application: Arc<Application>) -> HandlerResult {
    let Some(user_id) = message_user_id(&msg) else {
        return Ok(());
    };

    let mut player = application.open_player(user_id)?;
    let auto_next = !player.settings().auto_next;
    player.set_auto_next(auto_next)?;

    let state = if auto_next { "on" } else { "off" };
    bot.send_message(msg.chat.id, format!("Auto-next is {state}"))
        .await?;

    Ok(())
}

async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    application: Arc<Application>,
) -> HandlerResult {
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    log::info!("in callback_handler: data={data}");

    let command = match callback::Command::from_data_string(data) {
        Ok(command) => command,
        Err(err) => {
            log::warn!("{err}");
            bot.answer_callback_query(q.id.clone())
                .text(err.to_string())
                .await?;
            return Ok(());
        }
    };
    let mut player = application.open_player(UserID::new(q.from.id.0))?;

    let outcome = match command {
        callback::Command::ClearHistory(ClearHistoryOption::Yes) => {
            player.storage().clear_playback_history()?;
            Outcome::Text(String::from("History cleared"))
        }
        callback::Command::ClearHistory(ClearHistoryOption::No) => {
            Outcome::Text(String::from("History kept"))
        }
        callback::Command::MarkSeen(_) | callback::Command::Navigate(..) => {
            match player.restore_session().map(|_| ()) {
                Err(err) => Outcome::Answer(err.to_string()),
                Ok(()) if !is_for_open_stream(&command, player.current_episode()) => {
                    Outcome::Answer(String::from(STALE_BUTTON_TEXT))
                }
                Ok(()) => match command {
                    callback::Command::Navigate(Direction::Previous, _) => {
                        match player.previous_episode() {
                            Ok(_) => Outcome::NowPlaying,
                            Err(err) => Outcome::Answer(err.to_string()),
                        }
                    }
                    callback::Command::Navigate(Direction::Next, _) => {
                        match player.next_episode() {
                            Ok(_) => Outcome::NowPlaying,
                            Err(err) => Outcome::Answer(err.to_string()),
                        }
                    }
                    callback::Command::MarkSeen(_) | callback::Command::ClearHistory(_) => {
                        player.mark_watched()?;
                        Outcome::Answer(String::from("✅"))
                    }
                },
            }
        }
    };

    match outcome {
        Outcome::Answer(text) => {
            bot.answer_callback_query(q.id.clone()).text(text).await?;
        }
        Outcome::Text(text) => {
            bot.answer_callback_query(q.id.clone()).await?;
            if let Some(message) = q.regular_message() {
                bot.edit_message_text(message.chat.id, message.id, text)
                    .await?;
            }
        }
        Outcome::NowPlaying => {
            bot.answer_callback_query(q.id.clone()).await?;
            if let Some(message) = q.regular_message() {
                let url = player.current_url().unwrap_or_default();
                bot.edit_message_text(
                    message.chat.id,
                    message.id,
                    build_now_playing_text(url, player.current_episode()),
                )
                .reply_markup(build_navigation_keyboard(player.current_episode()))
                .await?;
            }
        }
    }

    Ok(())
}

async fn message_handler(bot: Bot, msg: Message, application: Arc<Application>) -> HandlerResult {
    let Some(user_id) = message_user_id(&msg) else {
        return Ok(());
    };
    let text = match msg.text() {
        Some(text) => text,
        None => return help_handler(bot, msg).await,
    };

    let hls_url = match validation::validate_hls_url(text, application.template_anchor()) {
        Ok(hls_url) => hls_url,
        Err(err) => {
            bot.send_message(msg.chat.id, format!("⚠️ {err}")).await?;
            return Ok(());
        }
    };

    log::info!(user_id = msg.chat.id.0; "opening stream");

    let mut player = application.open_player(user_id)?;
    let episode = player.open_url(&hls_url.url)?;

    bot.send_message(msg.chat.id, build_now_playing_text(&hls_url.url, episode))
        .reply_markup(build_navigation_keyboard(episode))
        .await?;

    Ok(())
}

enum Outcome {
    Answer(String),
    Text(String),
    NowPlaying,
}

fn message_user_id(msg: &Message) -> Option<UserID> {
    msg.from.as_ref().map(|user| UserID::new(user.id.0))
}

fn build_now_playing_text(url: &str, episode: Option<&EpisodeInfo>) -> String {
    match episode {
        Some(episode) => format!(
            "▶️ {url}\n\nSeries: {}\nEpisode: {}",
            episode.series, episode.episode
        ),
        None => format!("▶️ {url}\n\nNo episode number found, navigation is off."),
    }
}

/// Stream buttons only act when the episode they carry is the one open in the
/// user's session.
fn is_for_open_stream(command: &callback::Command, open: Option<&EpisodeInfo>) -> bool {
    match command.stream_episode() {
        Some(episode) => episode == open.map(|e| e.episode),
        None => true,
    }
}

fn build_navigation_keyboard(episode: Option<&EpisodeInfo>) -> InlineKeyboardMarkup {
    let mut navigation = Vec::new();
    if let Some(episode) = episode {
        if episode.episode > 1 {
            navigation.push(InlineKeyboardButton::callback(
                "⏮ Previous",
                callback::Command::Navigate(Direction::Previous, episode.episode)
                    .to_data_string(),
            ));
        }
        navigation.push(InlineKeyboardButton::callback(
            "Next ⏭",
            callback::Command::Navigate(Direction::Next, episode.episode).to_data_string(),
        ));
    }

    let watched = vec![InlineKeyboardButton::callback(
        "✅ Watched",
        callback::Command::MarkSeen(episode.map(|e| e.episode)).to_data_string(),
    )];

    InlineKeyboardMarkup::new(
        [navigation, watched]
            .into_iter()
            .filter(|row| !row.is_empty()),
    )
}

fn build_history_text(history: &[PlaybackHistory]) -> String {
    if history.is_empty() {
        return String::from("History is empty");
    }

    let lines: Vec<String> = history
        .iter()
        .take(HISTORY_PAGE_SIZE)
        .enumerate()
        .map(|(index, item)| {
            let name = match (&item.series, item.episode) {
                (Some(series), Some(episode)) => format!("{series} #{episode}"),
                _ => item.title.clone().unwrap_or_else(|| String::from("Stream")),
            };
            format!(
                "{}. {name}, {:.0}%\n{}",
                index + 1,
                item.watch_progress,
                item.url
            )
        })
        .collect();

    lines.join("\n\n")
}

fn format_position(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
