//! Interactive lap and session selection.
//!
//! Choices are listed with 1-based numbers; the operator answers with a
//! comma-separated list. An empty answer selects everything.

use std::io::{BufRead, Write};

use laprender_video::Video;

/// Parse a comma-separated list of 1-based numbers into 0-based indices,
/// keeping the order given and dropping repeats.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok((0..count).collect());
    }
    let mut picks = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let number: usize = part
            .parse()
            .map_err(|_| format!("'{part}' is not a number"))?;
        if number == 0 || number > count {
            return Err(format!("{number} is not between 1 and {count}"));
        }
        if !picks.contains(&(number - 1)) {
            picks.push(number - 1);
        }
    }
    Ok(picks)
}

/// Print `items` and read a selection from `input`, asking again on bad answers.
pub fn prompt_selection(
    title: &str,
    items: &[String],
    input: &mut dyn BufRead,
) -> anyhow::Result<Vec<usize>> {
    println!("{title}");
    for (i, item) in items.iter().enumerate() {
        println!("  {:>3}. {item}", i + 1);
    }
    loop {
        print!("Select (e.g. 1,3; Enter for all): ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            anyhow::bail!("Input closed before a selection was made");
        }
        match parse_selection(&line, items.len()) {
            Ok(picks) => return Ok(picks),
            Err(e) => println!("{e}"),
        }
    }
}

/// Position of a binding: `(video index, binding index)`.
pub type LapRef = (usize, usize);

/// Every binding of every video, in listing order.
pub fn lap_refs(videos: &[Video]) -> Vec<LapRef> {
    videos
        .iter()
        .enumerate()
        .flat_map(|(v, video)| (0..video.bindings().len()).map(move |b| (v, b)))
        .collect()
}

/// Render exactly the bindings in `chosen`.
pub fn apply_lap_selection(videos: &mut [Video], chosen: &[LapRef]) {
    for (v, video) in videos.iter_mut().enumerate() {
        for (b, binding) in video.bindings_mut().iter_mut().enumerate() {
            binding.render = chosen.contains(&(v, b));
        }
    }
}

/// Render every binding of the videos in `chosen`, nothing of the others.
pub fn apply_session_selection(videos: &mut [Video], chosen: &[usize]) {
    for (v, video) in videos.iter_mut().enumerate() {
        let keep = chosen.contains(&v);
        for binding in video.bindings_mut() {
            binding.render = keep;
        }
    }
}

/// Lap picker over all videos. Returns the picks in the order given.
pub fn pick_laps(videos: &[Video], input: &mut dyn BufRead) -> anyhow::Result<Vec<LapRef>> {
    let refs = lap_refs(videos);
    let items: Vec<String> = refs
        .iter()
        .map(|&(v, b)| format!("{} in {}", videos[v].bindings()[b].lap, videos[v].primary_filename()))
        .collect();
    let picks = prompt_selection("Laps:", &items, input)?;
    Ok(picks.into_iter().map(|i| refs[i]).collect())
}

/// Session picker: one entry per video that covers at least one lap.
pub fn pick_sessions(videos: &[Video], input: &mut dyn BufRead) -> anyhow::Result<Vec<usize>> {
    let candidates: Vec<usize> = (0..videos.len())
        .filter(|&v| !videos[v].bindings().is_empty())
        .collect();
    let items: Vec<String> = candidates
        .iter()
        .map(|&v| format!("{} ({} laps)", videos[v], videos[v].bindings().len()))
        .collect();
    let picks = prompt_selection("Sessions:", &items, input)?;
    Ok(picks.into_iter().map(|i| candidates[i]).collect())
}
