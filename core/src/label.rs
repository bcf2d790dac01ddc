/// Derive a breadcrumb-style display name from a URL path, e.g.
/// `/article/js-animation/width/` becomes `Article > Js Animation > Width`.
pub fn url_to_name(url_path: &str) -> String {
    let mut path = url_path;
    for suffix in [".html", ".php", ".asp"] {
        path = path.strip_suffix(suffix).unwrap_or(path);
    }

    let mut components: Vec<String> = path
        .split('/')
        .map(|component| title_case(&component.replace(['-', '_'], " ")))
        .collect();

    if components.last().is_some_and(String::is_empty) {
        components.pop();
    }

    // The first component is the empty string left of the leading slash.
    if components.len() > 1 {
        components[1..].join(" > ")
    } else {
        String::new()
    }
}

// Upper-cases the first letter of each word and leaves the rest untouched.
fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breadcrumbs_from_paths() {
        let cases = [
            ("/article/js-animation/width/", "Article > Js Animation > Width"),
            ("/class-inheritance", "Class Inheritance"),
            ("/async-await", "Async Await"),
            ("/task/calculator-extendable", "Task > Calculator Extendable"),
        ];
        for (path, want) in cases {
            assert_eq!(url_to_name(path), want, "url_to_name({path:?})");
        }
    }

    #[test]
    fn strips_page_suffixes() {
        assert_eq!(url_to_name("/docs/intro.html"), "Docs > Intro");
        assert_eq!(url_to_name("/contact.php"), "Contact");
    }

    #[test]
    fn root_has_no_name() {
        assert_eq!(url_to_name("/"), "");
        assert_eq!(url_to_name(""), "");
    }
}
