use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::info;

use crate::model::question::{Difficulty, OPTIONS_PER_QUESTION, Question};

/// Load the question bank: from the JSON file named by QUESTION_BANK_PATH
/// when set, otherwise the built-in dataset. Loaded once at startup and
/// held in memory for the lifetime of the process.
pub fn load_bank_from_env() -> Result<Vec<Question>> {
    match env::var("QUESTION_BANK_PATH") {
        Ok(path) if !path.is_empty() => {
            let bank = load_bank(Path::new(&path))
                .with_context(|| format!("loading question bank from {path}"))?;
            info!("Loaded {} questions from {path}", bank.len());
            Ok(bank)
        }
        _ => {
            let bank = builtin_bank();
            info!("Using built-in question bank ({} questions)", bank.len());
            Ok(bank)
        }
    }
}

pub fn load_bank(path: &Path) -> Result<Vec<Question>> {
    let raw = fs::read_to_string(path)?;
    let bank: Vec<Question> = serde_json::from_str(&raw)?;
    validate_bank(&bank)?;
    Ok(bank)
}

fn validate_bank(bank: &[Question]) -> Result<()> {
    if bank.is_empty() {
        bail!("question bank is empty");
    }
    for q in bank {
        if q.id.is_empty() || q.prompt.is_empty() {
            bail!("question with empty id or prompt");
        }
        if q.options.len() != OPTIONS_PER_QUESTION {
            bail!(
                "question {} has {} options, expected {OPTIONS_PER_QUESTION}",
                q.id,
                q.options.len()
            );
        }
        if q.correct_index >= q.options.len() {
            bail!("question {} has out-of-range correct index", q.id);
        }
    }
    Ok(())
}

fn q(
    id: &str,
    prompt: &str,
    options: [&str; OPTIONS_PER_QUESTION],
    correct_index: usize,
    difficulty: Difficulty,
) -> Question {
    Question {
        id: id.to_string(),
        prompt: prompt.to_string(),
        options: options.map(str::to_string).to_vec(),
        correct_index,
        difficulty,
    }
}

pub fn builtin_bank() -> Vec<Question> {
    use Difficulty::{Easy, Hard, Medium};
    vec![
        q(
            "1",
            "Which planet is known as the Red Planet?",
            ["Venus", "Mars", "Jupiter", "Mercury"],
            1,
            Easy,
        ),
        q(
            "2",
            "How many continents are there on Earth?",
            ["Five", "Six", "Seven", "Eight"],
            2,
            Easy,
        ),
        q(
            "3",
            "What is the largest ocean?",
            ["Atlantic", "Indian", "Arctic", "Pacific"],
            3,
            Easy,
        ),
        q(
            "4",
            "Which animal is the tallest in the world?",
            ["Elephant", "Giraffe", "Ostrich", "Moose"],
            1,
            Easy,
        ),
        q(
            "5",
            "What gas do plants absorb from the atmosphere?",
            ["Oxygen", "Nitrogen", "Carbon dioxide", "Hydrogen"],
            2,
            Easy,
        ),
        q(
            "6",
            "How many sides does a hexagon have?",
            ["Five", "Six", "Seven", "Eight"],
            1,
            Easy,
        ),
        q(
            "7",
            "Which instrument has 88 keys?",
            ["Organ", "Accordion", "Piano", "Harpsichord"],
            2,
            Easy,
        ),
        q(
            "8",
            "What is the capital of France?",
            ["Lyon", "Marseille", "Paris", "Nice"],
            2,
            Easy,
        ),
        q(
            "9",
            "Which metal is liquid at room temperature?",
            ["Mercury", "Aluminium", "Tin", "Lead"],
            0,
            Easy,
        ),
        q(
            "10",
            "How many minutes are in two hours?",
            ["90", "100", "110", "120"],
            3,
            Easy,
        ),
        q(
            "11",
            "Which country hosted the first modern Olympic Games?",
            ["Italy", "Greece", "France", "England"],
            1,
            Medium,
        ),
        q(
            "12",
            "What is the chemical symbol for gold?",
            ["Go", "Gd", "Au", "Ag"],
            2,
            Medium,
        ),
        q(
            "13",
            "Which artist painted the ceiling of the Sistine Chapel?",
            ["Raphael", "Michelangelo", "Leonardo da Vinci", "Donatello"],
            1,
            Medium,
        ),
        q(
            "14",
            "What is the longest river in the world?",
            ["Amazon", "Yangtze", "Mississippi", "Nile"],
            3,
            Medium,
        ),
        q(
            "15",
            "In which year did the Berlin Wall fall?",
            ["1987", "1989", "1991", "1993"],
            1,
            Medium,
        ),
        q(
            "16",
            "Which planet has the most moons?",
            ["Jupiter", "Saturn", "Uranus", "Neptune"],
            1,
            Medium,
        ),
        q(
            "17",
            "What is the smallest prime number?",
            ["Zero", "One", "Two", "Three"],
            2,
            Medium,
        ),
        q(
            "18",
            "Which language has the most native speakers?",
            ["English", "Hindi", "Spanish", "Mandarin Chinese"],
            3,
            Medium,
        ),
        q(
            "19",
            "Who wrote 'One Hundred Years of Solitude'?",
            [
                "Gabriel Garcia Marquez",
                "Jorge Luis Borges",
                "Pablo Neruda",
                "Mario Vargas Llosa",
            ],
            0,
            Hard,
        ),
        q(
            "20",
            "What is the SI unit of electrical capacitance?",
            ["Henry", "Farad", "Tesla", "Weber"],
            1,
            Hard,
        ),
        q(
            "21",
            "Which ancient wonder stood at Halicarnassus?",
            [
                "The Colossus",
                "The Hanging Gardens",
                "The Mausoleum",
                "The Lighthouse",
            ],
            2,
            Hard,
        ),
        q(
            "22",
            "In what year was the double-helix structure of DNA published?",
            ["1948", "1953", "1958", "1962"],
            1,
            Hard,
        ),
        q(
            "23",
            "Which composer wrote 'The Well-Tempered Clavier'?",
            ["Handel", "Vivaldi", "Bach", "Telemann"],
            2,
            Hard,
        ),
        q(
            "24",
            "What is the capital of Kazakhstan?",
            ["Almaty", "Astana", "Tashkent", "Bishkek"],
            1,
            Hard,
        ),
    ]
}
