use clap::{arg, value_parser, Arg, Command};

// Clap sub command syntax defintions
pub fn syntax() -> Command {
    // strip out usage
    const PARSER_TEMPLATE: &str = "\
        {all-args}
    ";
    // strip out name/version
    const APPLET_TEMPLATE: &str = "\
        {about-with-newline}\n\
        {usage-heading}\n    {usage}\n\
        \n\
        {all-args}{after-help}\
    ";

    Command::new("db32")
        .multicall(true)
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand_value_name("Command")
        .subcommand_help_heading("Commands")
        .help_template(PARSER_TEMPLATE)
        .subcommand(
            Command::new("continue")
                .aliases(["c", "go", "g"])
                .about("continue the execution of the program")
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("quit")
                .aliases(["exit", "q"])
                .about("Quit db32")
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("step")
                .alias("si")
                .about("execute N instructions (default 1)")
                .arg(
                    Arg::new("count")
                        .value_parser(value_parser!(u64).range(1..))
                        .default_value("1"),
                )
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("info")
                .about("print registers (r) or watchpoints (w)")
                .arg(
                    Arg::new("what")
                        .required(true)
                        .value_parser(["r", "w"]),
                )
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("print")
                .alias("p")
                .about("evaluate an expression")
                .arg(arg!(<expr> ... "expression").allow_hyphen_values(true))
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("examine")
                .alias("x")
                .about("display N 4 byte words starting at the value of an expression")
                .arg(arg!(<count> "number of words").value_parser(value_parser!(usize)))
                .arg(arg!(<expr> ... "start address").allow_hyphen_values(true))
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("watch")
                .alias("w")
                .about("stop when the value of an expression changes")
                .arg(arg!(<expr> ... "expression to watch").allow_hyphen_values(true))
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("delete")
                .alias("d")
                .about("delete a watchpoint, all of them if no number given")
                .arg(Arg::new("id").value_parser(value_parser!(usize)))
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("set")
                .about("set a register")
                .arg(arg!(<register> "register name"))
                .arg(arg!(<expr> ... "new value").allow_hyphen_values(true))
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("write")
                .about("write hex bytes to memory")
                .arg(arg!(<address> "address expression"))
                .arg(arg!(<bytes> "hex string, eg 90d6"))
                .help_template(APPLET_TEMPLATE),
        )
        .subcommand(
            Command::new("load")
                .about("load a raw binary image and restart")
                .arg(Arg::new("file").required(true))
                .arg_required_else_help(true)
                .help_template(APPLET_TEMPLATE),
        )
}
