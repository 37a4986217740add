//! Instruction blocks sent to the generator.

/// Which instruction block precedes the raw listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstructionTemplate {
    /// Full rule set with worked examples and a `note` field.
    Detailed,
    /// Three keys, no note. Shorter prompt, faster turnaround.
    #[default]
    Fast,
}

impl InstructionTemplate {
    /// The template matching the `include_note` setting.
    pub fn for_note(include_note: bool) -> Self {
        if include_note {
            InstructionTemplate::Detailed
        } else {
            InstructionTemplate::Fast
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            InstructionTemplate::Detailed => DETAILED_INSTRUCTION,
            InstructionTemplate::Fast => FAST_INSTRUCTION,
        }
    }

    /// Whether the generator's own note should be kept.
    pub fn keeps_note(self) -> bool {
        matches!(self, InstructionTemplate::Detailed)
    }

    /// Full prompt for one raw listing.
    pub fn render(self, raw: &str) -> String {
        format!("{}\n\nRaw conference string:\n{raw}\n\nJSON:", self.text())
    }
}

/// Prompt asking the generator to pick one series among numbered candidates.
pub fn series_prompt(conf_name: &str, conf_dates: &str, candidates: &[(&str, &str)]) -> String {
    let listing = candidates
        .iter()
        .enumerate()
        .map(|(i, (slug, name))| format!("{}. slug='{slug}', name='{name}'", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "{SERIES_INSTRUCTION}\n\nconf_name: {conf_name}\nconf_dates: {conf_dates}\n\nCandidates:\n{listing}\n\nJSON:"
    )
}

const DETAILED_INSTRUCTION: &str = r#"
You are cleaning conference metadata.

You will receive ONE raw conference string, for example:
"38th Annual ACM Symposium on User Interface Software and Technology, UIST 2025, Busan, Korea, September 28 - October 1, 2025"

Your task is to extract:
- conf_name
- conf_place
- conf_dates
- note

You must respond as a SINGLE JSON object:
{
  "conf_name": "...",
  "conf_place": "...",
  "conf_dates": "...",
  "note": "..."
}

==================================================
1. General principles
==================================================

- Use ONLY information present in the raw string.
- Do NOT invent or guess conference names, locations, months, or days.
- If something cannot be inferred, use an empty string for that field.
- If the string only contains a date range and no recognizable name or place:
  - conf_name: ""
  - conf_place: ""
  - conf_dates: normalized date range

The "note" field:
- Very short explanation (max 20 words).
- Summarize how you interpreted the string.

==================================================
1.1 Separating name vs place
==================================================

- In many strings, the pattern is:
  "[Conference name], [City][, Region][, Country], [dates]"
- Anything after the main conference title that looks like a city/region/country
  (e.g. "Stavanger Norway", "San Diego, United States", "Busan, Korea")
  should go to conf_place, NOT conf_name.
- Do NOT keep "City Country" at the end of conf_name if it obviously denotes location.
- Example:
  Raw: "Hydropower 15 in 83rd ICOLD Meeting, Stavanger Norway"
  Good conf_name: "Hydropower 15 in 83rd ICOLD Meeting"
  Good conf_place: "Stavanger, Norway"
  conf_dates: ""  (no explicit dates in the string)

==================================================
2. conf_name rules
==================================================

2.1 What belongs in conf_name

- Include the full conference name and series, including:
  - Ordinal numbers: "12th", "38th", etc.
  - Years that clearly belong to the event name.
  - Acronyms and acronym+year patterns that refer to the specific edition.

Examples:
- "ATTCE 2001-Automotive and Transport Technology Congress and Exhibition"
- "European Congress on Computational Methods in Applied Sciences and Engineering, ECCOMAS 2004"
- "AMIF 2002, Applied Mathematics for Industrial Flow Problems, Third International Conference"
- "International Conference on Fatigue Crack Path (FCP 2003)"
- "12th IEEE/ACM International Symposium on Networks-on-Chip, NOCS 2018"

In all these cases, the year and acronym are part of the NAME and must stay in conf_name.

- If an acronym+year clearly refers to the conference edition (e.g. "HRI 2025", "UIST 2025", "DIS 2019", "ICASSP 2008"):
  - Keep the whole pattern in conf_name, not just the acronym.

Example:
Input:
"20th Annual ACM/IEEE International Conference on Human-Robot Interaction, HRI 2025, Melbourne, Australia, ..."
Good conf_name:
"20th Annual ACM/IEEE International Conference on Human-Robot Interaction, HRI 2025"

Example:
Input:
"2020 IEEE International Conference on Communications, ICC 2020; Convention Centre Dublin, Dublin; Ireland..."
Good conf_name:
"2020 IEEE International Conference on Communications, ICC 2020"

Example:
Input:
"2019 ACM Conference on Designing Interactive Systems, DIS 2019; San Diego; United States; 23 June 2019 through 28 June 2019"
Good conf_name:
"2019 ACM Conference on Designing Interactive Systems, DIS 2019"

- If the conference name starts with an abbreviation followed by a colon:
  - Keep that abbreviation and the colon in conf_name.

Example:
Input:
"SC23: The International Conference for High Performance Computing, Networking, Storage, and Analysis, Denver, CO, USA, November 12-17 2023"
Good conf_name:
"SC23: The International Conference for High Performance Computing, Networking, Storage, and Analysis"

- If the conference name starts with a year that clearly belongs to the event:
  - Keep that year in conf_name, even if dates are also in conf_dates.
  Example: "2019 ACM Conference on X"

2.2 Acronyms in parentheses

- If an acronym appears in parentheses immediately after the full name:
  - Keep the full pattern in conf_name.

Example:
Input:
"2011 American Control Conference (ACC) on O'Farrell Street, San Francisco, CA"
Good conf_name:
"2011 American Control Conference (ACC)"

- Acronyms in parentheses with or without year (e.g. "(IEEE PIMRC)") should be kept in conf_name, not dropped.

2.3 What must NOT be in conf_name

- conf_name must NOT contain explicit date expressions:
  - Days, months, date ranges, or standalone years used only as dates.
  - Examples: "27 April 2004", "April 27-29, 2004", "2004-04-27".
- These belong only in conf_dates. If such dates appear, remove them from conf_name.

2.4 Capitalization rules for conf_name

- Preserve acronyms in uppercase EXACTLY as they appear: AIAA, IEEE, IFAC, EMAS, ATTCE, etc.
- For other words, use title-style capitalization:
  - Capitalize main words.
  - Keep small connector words lowercase: and, of, on, in, for, to, the, a, an, at, by, with
    (except when they are the first word or follow a colon).

==================================================
3. conf_place rules
==================================================

3.1 What belongs in conf_place

- City/region + country (if present).
- Normalize capitalization:
  - Use "Strasbourg, France" not "STRASBOURG, FRANCE".

3.2 Diacritics

- When obvious, correct ASCII city names to local spelling with diacritics, e.g.:
  - "Jyvaskyla" -> "Jyväskylä"
  - "Goteborg" -> "Göteborg"
  - "Malmo" -> "Malmö"
- Only add diacritics when you are confident; otherwise keep a safe ASCII form.

==================================================
4. conf_dates rules
==================================================

Always normalize conf_dates using an ISO-like format.

4.1 Full date range available

- Format:
  "YYYY-MM-DD / YYYY-MM-DD"
Example:
- Input: "APR 27-29, 2004"
- conf_dates: "2004-04-27 / 2004-04-29"

4.2 Single known day

- Format:
  "YYYY-MM-DD"

4.3 Only month and year known (no specific days)

- Format:
  "YYYY-MM / YYYY-MM"
- Do NOT invent days.

4.4 Only a year known

- If the ONLY date information in the raw string is a year (e.g. "IAVSD 2019",
  "NOCS 2018") and there is NO explicit month or day anywhere:
  - Treat this as a year-only case.
  - conf_dates MUST be: "YYYY / YYYY"
  - Example: year = 2019 -> conf_dates: "2019 / 2019"
- IMPORTANT:
  - Do NOT invent months or days.
  - NEVER use patterns like "YYYY-01-01 / YYYY-12-31" when only a year is present.

4.5 General rules

- Use 4-digit years and 2-digit months/days where they are explicitly given.
- Do NOT invent specific months or days when only a year is mentioned.
- If no date information at all is available:
  - conf_dates: ""

==================================================
5. Missing information
==================================================

- If conf_name cannot be determined: use "".
- If conf_place cannot be determined: use "".
- If conf_dates cannot be determined: use "".

If the raw string only contains a date range and no recognizable name or place:
- conf_name: ""
- conf_place: ""
- conf_dates: normalized date range as above.

==================================================
6. Output format
==================================================

Respond ONLY as a single JSON object, for example:

{
  "conf_name": "2019 ACM Conference on Designing Interactive Systems, DIS 2019",
  "conf_place": "San Diego, United States",
  "conf_dates": "2019-06-23 / 2019-06-28",
  "note": "Kept acronym+year in name; extracted city, country, and full date range."
}
"#;

const FAST_INSTRUCTION: &str = r#"
You are cleaning conference metadata.

You will receive ONE raw conference string that may contain:
- A conference name
- A location (city, region, country)
- A date or date range

Extract ONLY:
- conf_name
- conf_place
- conf_dates

Rules:
- Use only information in the raw string.
- Do not invent or guess names, locations, months, or days.
- If something cannot be inferred, use an empty string for that field.

conf_dates format:
- Always normalize to an ISO-like format.
- If a full date range is given (start and end day):
  "YYYY-MM-DD / YYYY-MM-DD"
  Example: "APR 27-29, 2004" -> "2004-04-27 / 2004-04-29"
- If only one specific day is given:
  "YYYY-MM-DD"
- If only month and year are given:
  "YYYY-MM / YYYY-MM"  (same month on both sides)
- If only a year is given and no month or day appears anywhere:
  "YYYY / YYYY"
- If there is no date information at all:
  conf_dates: ""

Return a SINGLE JSON object with exactly these keys:
{
  "conf_name": "...",
  "conf_place": "...",
  "conf_dates": "..."
}

Respond with only this JSON, no explanations or extra text.
"#;

const SERIES_INSTRUCTION: &str = r#"
You are matching a cleaned conference instance to its conference series in the dblp knowledge graph.

You get:
- conf_name: normalized conference instance name
- conf_dates: normalized conference dates (if any)
- A small list of candidate conference series, each with slug and name.

Task:
- Choose the single best matching conference series from the candidate list.
- Prefer exact or near-exact matches on name and acronym, ignoring year and local edition.
- If no candidate is clearly appropriate, return chosen_index = null.

Respond ONLY as JSON, for example:
{
  "chosen_index": 1,
  "reason": "short explanation, max 20 words"
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_layout() {
        let p = InstructionTemplate::Fast.render("ICC 2020, Dublin");
        assert!(p.starts_with(FAST_INSTRUCTION));
        assert!(p.ends_with("\n\nRaw conference string:\nICC 2020, Dublin\n\nJSON:"));
    }

    #[test]
    fn note_selects_detailed_template() {
        assert_eq!(InstructionTemplate::for_note(true), InstructionTemplate::Detailed);
        assert_eq!(InstructionTemplate::for_note(false), InstructionTemplate::Fast);
        assert!(InstructionTemplate::Detailed.text().contains("\"note\""));
        assert!(!InstructionTemplate::Fast.text().contains("\"note\""));
        assert!(InstructionTemplate::Detailed.keeps_note());
    }

    #[test]
    fn series_prompt_numbers_candidates() {
        let p = series_prompt("ICC 2020", "2020 / 2020", &[("icc", "ICC"), ("globecom", "GLOBECOM")]);
        assert!(p.contains("conf_name: ICC 2020\nconf_dates: 2020 / 2020"));
        assert!(p.contains("1. slug='icc', name='ICC'\n2. slug='globecom', name='GLOBECOM'"));
        assert!(p.ends_with("\n\nJSON:"));
    }
}
