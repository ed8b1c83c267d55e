//! Slash-command definitions and option parsing.

use serenity::{
    all::{ChannelType, CommandData, CommandOptionType, ResolvedOption, ResolvedValue},
    builder::{CreateCommand, CreateCommandOption},
};

use crosspost_relay::{
    Command,
    commands::{BlacklistAction, ChannelKind, ChannelOption, RoleOption, UserOption},
    ids::{ChannelId, RoleId, UserId},
};

/// The full global command set.
pub fn definitions() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(Command::SET_HOST_CHANNEL)
            .description("Set the host channel in this server.")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "channel",
                    "Select the host channel",
                )
                .required(true),
            ),
        CreateCommand::new(Command::SET_RECIPIENT_CHANNEL)
            .description("Set the recipient channel in the recipient server.")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Channel,
                    "channel",
                    "Select the recipient channel",
                )
                .required(true),
            ),
        CreateCommand::new(Command::BLACKLIST)
            .description("Manage blacklisted users")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::SubCommand,
                    "add",
                    "Add a user to the blacklist",
                )
                .add_sub_option(
                    CreateCommandOption::new(CommandOptionType::User, "user", "User to blacklist")
                        .required(true),
                ),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::SubCommand,
                    "remove",
                    "Remove a user from the blacklist",
                )
                .add_sub_option(
                    CreateCommandOption::new(
                        CommandOptionType::User,
                        "user",
                        "User to remove from the blacklist",
                    )
                    .required(true),
                ),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::SubCommand,
                "list",
                "View the blacklisted users",
            )),
        CreateCommand::new(Command::SET_MANAGE_ROLE)
            .description("Set the manage role for controlling the bot.")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Role,
                    "role",
                    "Select the role to manage the bot",
                )
                .required(true),
            ),
    ]
}

/// Turn an application-command payload into a relay [`Command`].
///
/// Returns `None` for unknown commands or missing options.
pub fn parse(data: &CommandData) -> Option<Command> {
    let options = data.options();
    match data.name.as_str() {
        Command::SET_HOST_CHANNEL => channel_option(&options).map(Command::SetHostChannel),
        Command::SET_RECIPIENT_CHANNEL => {
            channel_option(&options).map(Command::SetRecipientChannel)
        },
        Command::SET_MANAGE_ROLE => role_option(&options).map(Command::SetManageRole),
        Command::BLACKLIST => {
            let sub = options.first()?;
            let ResolvedValue::SubCommand(sub_options) = &sub.value else {
                return None;
            };
            let action = match sub.name {
                "add" => BlacklistAction::Add(user_option(sub_options)?),
                "remove" => BlacklistAction::Remove(user_option(sub_options)?),
                "list" => BlacklistAction::List,
                _ => return None,
            };
            Some(Command::Blacklist(action))
        },
        _ => None,
    }
}

pub(crate) fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Text => ChannelKind::Text,
        _ => ChannelKind::Other,
    }
}

fn channel_option(options: &[ResolvedOption<'_>]) -> Option<ChannelOption> {
    options.iter().find_map(|opt| match &opt.value {
        ResolvedValue::Channel(channel) if opt.name == "channel" => Some(ChannelOption {
            id: ChannelId::new(channel.id.to_string()),
            name: channel.name.clone().unwrap_or_default(),
            kind: channel_kind(channel.kind),
        }),
        _ => None,
    })
}

fn user_option(options: &[ResolvedOption<'_>]) -> Option<UserOption> {
    options.iter().find_map(|opt| match &opt.value {
        ResolvedValue::User(user, _) if opt.name == "user" => Some(UserOption {
            id: UserId::new(user.id.to_string()),
            username: user.name.clone(),
        }),
        _ => None,
    })
}

fn role_option(options: &[ResolvedOption<'_>]) -> Option<RoleOption> {
    options.iter().find_map(|opt| match &opt.value {
        ResolvedValue::Role(role) if opt.name == "role" => Some(RoleOption {
            id: RoleId::new(role.id.to_string()),
            name: role.name.clone(),
        }),
        _ => None,
    })
}
