/// Split a raw line into its command name and the remaining argument string.
///
/// Blank lines and lines whose first non-whitespace character is `#` yield
/// `("", "")`. Otherwise the command is the first whitespace-delimited token
/// and the argument string is the trimmed remainder.
///
/// ```
/// use tsh::split_line;
/// assert_eq!(split_line(" ls  -l /usr "), ("ls", "-l /usr"));
/// assert_eq!(split_line(" ls  "), ("ls", ""));
/// assert_eq!(split_line("  # comment"), ("", ""));
/// ```
pub fn split_line(line: &str) -> (&str, &str) {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return ("", "");
    }
    match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::split_line;

    #[test]
    fn splits_command_from_arguments() {
        assert_eq!(split_line("cd /tmp"), ("cd", "/tmp"));
        assert_eq!(split_line("\tls   -l   -a\n"), ("ls", "-l   -a"));
        assert_eq!(split_line("pwd"), ("pwd", ""));
    }

    #[test]
    fn blank_and_comment_lines_are_empty() {
        for line in ["", "   ", "\n", "#", "# cd /", "   #ls", "\t# x y z"] {
            assert_eq!(split_line(line), ("", ""), "line {:?}", line);
        }
    }

    #[test]
    fn hash_after_command_is_an_argument() {
        assert_eq!(split_line("echo #not-a-comment"), ("echo", "#not-a-comment"));
    }

    #[test]
    fn command_never_contains_whitespace() {
        let samples = [
            "a b",
            " a\tb ",
            "x\u{a0}y z",
            "alias ls='ls -l'",
            "one\n two",
            "  trailing   ",
        ];
        for s in samples {
            let (cmd, _) = split_line(s);
            assert!(!cmd.is_empty());
            assert!(
                !cmd.chars().any(char::is_whitespace),
                "command {:?} from {:?}",
                cmd,
                s
            );
        }
    }
}
