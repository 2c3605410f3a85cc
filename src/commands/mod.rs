// src/commands/mod.rs
pub mod alias_cmd;
pub mod awk;
pub mod base64_cmd;
pub mod basename;
pub mod bash_cmd;
pub mod cat;
pub mod chmod;
pub mod clear_cmd;
pub mod column_cmd;
pub mod comm_cmd;
pub mod cp;
pub mod curl;
pub mod cut;
pub mod date;
pub mod diff_cmd;
pub mod dirname;
pub mod du_cmd;
pub mod echo;
pub mod env;
pub mod expand_cmd;
pub mod expr_cmd;
pub mod file_cmd;
pub mod find;
pub mod fold_cmd;
pub mod grep;
pub mod gzip;
pub mod head;
pub mod help_cmd;
pub mod history_cmd;
pub mod hostname_cmd;
pub mod html_to_markdown_cmd;
pub mod join;
pub mod jq;
pub mod ln;
pub mod ls;
pub mod md5sum;
pub mod mkdir;
pub mod mv;
pub mod nl;
pub mod od_cmd;
pub mod paste;
pub mod printf;
pub mod pwd;
pub mod query_engine;
pub mod readlink_cmd;
pub mod registry;
pub mod rev_cmd;
pub mod rg_cmd;
pub mod rm;
pub mod rmdir_cmd;
pub mod sed;
pub mod seq;
pub mod sleep_cmd;
pub mod sort;
pub mod split_cmd;
pub mod sqlite3_cmd;
pub mod stat_cmd;
pub mod strings_cmd;
pub mod tac_cmd;
pub mod tail;
pub mod tar;
pub mod tee;
pub mod test_cmd;
pub mod time_cmd;
pub mod timeout_cmd;
pub mod touch;
pub mod tr;
pub mod tree_cmd;
pub mod true_cmd;
pub mod unalias_cmd;
pub mod uniq;
pub mod utils;
pub mod wc;
pub mod which_cmd;
pub mod whoami_cmd;
pub mod xan_cmd;
pub mod xargs;
pub mod yq;

pub use registry::CommandRegistry;
pub use types::{Command, CommandContext, CommandResult};

pub use alias_cmd::AliasCommand;
pub use awk::AwkCommand;
pub use base64_cmd::Base64Command;
pub use basename::BasenameCommand;
pub use bash_cmd::{BashCommand, ShCommand};
pub use cat::CatCommand;
pub use chmod::ChmodCommand;
pub use clear_cmd::ClearCommand;
pub use column_cmd::ColumnCommand;
pub use comm_cmd::CommCommand;
pub use cp::CpCommand;
pub use curl::CurlCommand;
pub use cut::CutCommand;
pub use date::DateCommand;
pub use diff_cmd::DiffCommand;
pub use dirname::DirnameCommand;
pub use du_cmd::DuCommand;
pub use echo::EchoCommand;
pub use env::{EnvCommand, PrintenvCommand};
pub use expand_cmd::ExpandCommand;
pub use expr_cmd::ExprCommand;
pub use file_cmd::FileCommand;
pub use find::FindCommand;
pub use fold_cmd::FoldCommand;
pub use grep::GrepCommand;
pub use gzip::{GzipCommand, GunzipCommand, ZcatCommand};
pub use head::HeadCommand;
pub use help_cmd::HelpCommand;
pub use history_cmd::HistoryCommand;
pub use hostname_cmd::HostnameCommand;
pub use html_to_markdown_cmd::HtmlToMarkdownCommand;
pub use join::JoinCommand;
pub use jq::JqCommand;
pub use ln::LnCommand;
pub use ls::LsCommand;
pub use md5sum::{Md5sumCommand, Sha1sumCommand, Sha256sumCommand};
pub use mkdir::MkdirCommand;
pub use mv::MvCommand;
pub use nl::NlCommand;
pub use od_cmd::OdCommand;
pub use paste::PasteCommand;
pub use printf::PrintfCommand;
pub use pwd::PwdCommand;
pub use readlink_cmd::ReadlinkCommand;
pub use rev_cmd::RevCommand;
pub use rg_cmd::RgCommand;
pub use rm::RmCommand;
pub use rmdir_cmd::RmdirCommand;
pub use sed::SedCommand;
pub use seq::SeqCommand;
pub use sleep_cmd::SleepCommand;
pub use sort::SortCommand;
pub use split_cmd::SplitCommand;
pub use sqlite3_cmd::Sqlite3Command;
pub use stat_cmd::StatCommand;
pub use strings_cmd::StringsCommand;
pub use tac_cmd::TacCommand;
pub use tail::TailCommand;
pub use tar::TarCommand;
pub use tee::TeeCommand;
pub use test_cmd::{TestCommand, BracketCommand};
pub use time_cmd::TimeCommand;
pub use timeout_cmd::TimeoutCommand;
pub use touch::TouchCommand;
pub use tr::TrCommand;
pub use tree_cmd::TreeCommand;
pub use true_cmd::{TrueCommand, FalseCommand};
pub use unalias_cmd::UnaliasCommand;
pub use uniq::UniqCommand;
pub use wc::WcCommand;
pub use which_cmd::WhichCommand;
pub use whoami_cmd::WhoamiCommand;
pub use xan_cmd::XanCommand;
pub use xargs::XargsCommand;
pub use yq::YqCommand;

/// Builds a [`CommandRegistry`] populated with every builtin-adjacent command
/// this shell ships: the external-collaborator utilities (grep, sed, awk, jq,
/// yq, sqlite3, xan, ...) that the executor falls back to once it has ruled
/// out shell keywords, functions, and true builtins.
pub fn default_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();

    registry.register("alias", Box::new(AliasCommand));
    registry.register("unalias", Box::new(UnaliasCommand));
    registry.register("awk", Box::new(AwkCommand));
    registry.register("base64", Box::new(Base64Command));
    registry.register("basename", Box::new(BasenameCommand));
    registry.register("bash", Box::new(BashCommand));
    registry.register("sh", Box::new(ShCommand));
    registry.register("cat", Box::new(CatCommand));
    registry.register("chmod", Box::new(ChmodCommand));
    registry.register("clear", Box::new(ClearCommand));
    registry.register("column", Box::new(ColumnCommand));
    registry.register("comm", Box::new(CommCommand));
    registry.register("cp", Box::new(CpCommand));
    registry.register("curl", Box::new(CurlCommand));
    registry.register("cut", Box::new(CutCommand));
    registry.register("date", Box::new(DateCommand));
    registry.register("diff", Box::new(DiffCommand));
    registry.register("dirname", Box::new(DirnameCommand));
    registry.register("du", Box::new(DuCommand));
    registry.register("echo", Box::new(EchoCommand));
    registry.register("env", Box::new(EnvCommand));
    registry.register("printenv", Box::new(PrintenvCommand));
    registry.register("expand", Box::new(ExpandCommand));
    registry.register("expr", Box::new(ExprCommand));
    registry.register("file", Box::new(FileCommand));
    registry.register("find", Box::new(FindCommand));
    registry.register("fold", Box::new(FoldCommand));
    registry.register("grep", Box::new(GrepCommand));
    registry.register("egrep", Box::new(GrepCommand));
    registry.register("fgrep", Box::new(GrepCommand));
    registry.register("gzip", Box::new(GzipCommand));
    registry.register("gunzip", Box::new(GunzipCommand));
    registry.register("zcat", Box::new(ZcatCommand));
    registry.register("head", Box::new(HeadCommand));
    registry.register("help", Box::new(HelpCommand));
    registry.register("history", Box::new(HistoryCommand));
    registry.register("hostname", Box::new(HostnameCommand));
    registry.register("html-to-markdown", Box::new(HtmlToMarkdownCommand));
    registry.register("join", Box::new(JoinCommand));
    registry.register("jq", Box::new(JqCommand));
    registry.register("ln", Box::new(LnCommand));
    registry.register("ls", Box::new(LsCommand));
    registry.register("md5sum", Box::new(Md5sumCommand));
    registry.register("sha1sum", Box::new(Sha1sumCommand));
    registry.register("sha256sum", Box::new(Sha256sumCommand));
    registry.register("mkdir", Box::new(MkdirCommand));
    registry.register("mv", Box::new(MvCommand));
    registry.register("nl", Box::new(NlCommand));
    registry.register("od", Box::new(OdCommand));
    registry.register("paste", Box::new(PasteCommand));
    registry.register("printf", Box::new(PrintfCommand));
    registry.register("pwd", Box::new(PwdCommand));
    registry.register("readlink", Box::new(ReadlinkCommand));
    registry.register("rev", Box::new(RevCommand));
    registry.register("rg", Box::new(RgCommand));
    registry.register("rm", Box::new(RmCommand));
    registry.register("rmdir", Box::new(RmdirCommand));
    registry.register("sed", Box::new(SedCommand));
    registry.register("seq", Box::new(SeqCommand));
    registry.register("sleep", Box::new(SleepCommand));
    registry.register("sort", Box::new(SortCommand));
    registry.register("split", Box::new(SplitCommand));
    registry.register("sqlite3", Box::new(Sqlite3Command));
    registry.register("stat", Box::new(StatCommand));
    registry.register("strings", Box::new(StringsCommand));
    registry.register("tac", Box::new(TacCommand));
    registry.register("tail", Box::new(TailCommand));
    registry.register("tar", Box::new(TarCommand));
    registry.register("tee", Box::new(TeeCommand));
    registry.register("test", Box::new(TestCommand));
    registry.register("[", Box::new(BracketCommand));
    registry.register("time", Box::new(TimeCommand));
    registry.register("timeout", Box::new(TimeoutCommand));
    registry.register("touch", Box::new(TouchCommand));
    registry.register("tr", Box::new(TrCommand));
    registry.register("tree", Box::new(TreeCommand));
    registry.register("true", Box::new(TrueCommand));
    registry.register("false", Box::new(FalseCommand));
    registry.register("uniq", Box::new(UniqCommand));
    registry.register("wc", Box::new(WcCommand));
    registry.register("which", Box::new(WhichCommand));
    registry.register("whoami", Box::new(WhoamiCommand));
    registry.register("xan", Box::new(XanCommand));
    registry.register("xargs", Box::new(XargsCommand));
    registry.register("yq", Box::new(YqCommand));

    registry
}
