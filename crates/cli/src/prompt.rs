use std::io::{self, BufRead, Write};

/// Asks for a name until a non-empty line is entered.
///
/// The greeting tells a first-time user they are enrolling.
pub fn read_name(
    input: &mut impl BufRead,
    output: &mut impl Write,
    first_enrollment: bool,
) -> io::Result<String> {
    if first_enrollment {
        writeln!(output, "No one is enrolled yet. Your capture becomes the reference.")?;
    } else {
        writeln!(output, "Press 's' to capture your face for verification, 'q' to quit.")?;
    }

    loop {
        write!(output, "Name: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no name entered",
            ));
        }
        let name = line.trim();
        if !name.is_empty() {
            return Ok(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(input: &str, first: bool) -> (io::Result<String>, String) {
        let mut out = Vec::new();
        let result = read_name(&mut input.as_bytes(), &mut out, first);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_reads_trimmed_name() {
        let (name, _) = prompt("  alice \n", true);
        assert_eq!(name.unwrap(), "alice");
    }

    #[test]
    fn test_blank_lines_are_asked_again() {
        let (name, out) = prompt("\n   \nbob\n", false);
        assert_eq!(name.unwrap(), "bob");
        assert_eq!(out.matches("Name: ").count(), 3);
    }

    #[test]
    fn test_end_of_input_is_an_error() {
        let (name, _) = prompt("\n", true);
        assert_eq!(name.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_greeting_depends_on_enrollment_state() {
        let (_, first) = prompt("alice\n", true);
        let (_, returning) = prompt("alice\n", false);
        assert!(first.contains("No one is enrolled yet"));
        assert!(returning.contains("verification"));
    }
}
