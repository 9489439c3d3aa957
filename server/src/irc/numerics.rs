//! Numeric reply codes sent by the server.

pub const RPL_WELCOME: &str = "001";
pub const RPL_NAMREPLY: &str = "353";
pub const RPL_ENDOFNAMES: &str = "366";
pub const RPL_MOTD: &str = "372";
pub const RPL_MOTDSTART: &str = "375";
pub const RPL_ENDOFMOTD: &str = "376";

pub const ERR_NOSUCHNICK: &str = "401";
pub const ERR_NOSUCHCHANNEL: &str = "403";
pub const ERR_UNKNOWNCOMMAND: &str = "421";
pub const ERR_NOMOTD: &str = "422";
pub const ERR_ERRONEUSNICKNAME: &str = "432";
pub const ERR_NICKNAMEINUSE: &str = "433";
pub const ERR_CHANNELEXISTS: &str = "437";
pub const ERR_USERNOTINCHANNEL: &str = "441";
pub const ERR_PUBLICCHANNEL: &str = "443";
pub const ERR_NEEDMOREPARAMS: &str = "461";
pub const ERR_UNKNOWNMODE: &str = "472";
pub const ERR_INVITEONLYCHAN: &str = "473";
pub const ERR_CHANOPRIVSNEEDED: &str = "482";
