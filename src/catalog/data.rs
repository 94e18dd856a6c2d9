//! Built-in kanji tables, used offline and as the base for enrichment.

use crate::core::{
    Example,
    KanjiEntry,
};

struct StaticKanji {
    character: &'static str,
    meanings: &'static [&'static str],
    onyomi: &'static [&'static str],
    kunyomi: &'static [&'static str],
    examples: &'static [(&'static str, &'static str, &'static str)], // (word, reading, meaning)
}

const N5: &[StaticKanji] = &[
    StaticKanji {
        character: "人",
        meanings: &["person", "human"],
        onyomi: &["ジン", "ニン"],
        kunyomi: &["ひと"],
        examples: &[("人間", "にんげん", "human being"), ("日本人", "にほんじん", "Japanese person")],
    },
    StaticKanji {
        character: "日",
        meanings: &["day", "sun"],
        onyomi: &["ニチ", "ジツ"],
        kunyomi: &["ひ", "か"],
        examples: &[("今日", "きょう", "today"), ("日本", "にほん", "Japan")],
    },
    StaticKanji {
        character: "本",
        meanings: &["book", "origin", "main"],
        onyomi: &["ホン"],
        kunyomi: &["もと"],
        examples: &[("本", "ほん", "book"), ("日本", "にほん", "Japan")],
    },
    StaticKanji {
        character: "学",
        meanings: &["study", "learning", "science"],
        onyomi: &["ガク"],
        kunyomi: &["まな"],
        examples: &[("学校", "がっこう", "school"), ("学生", "がくせい", "student")],
    },
    StaticKanji {
        character: "生",
        meanings: &["life", "birth", "genuine"],
        onyomi: &["セイ", "ショウ"],
        kunyomi: &["い", "う", "なま"],
        examples: &[("学生", "がくせい", "student"), ("先生", "せんせい", "teacher")],
    },
    StaticKanji {
        character: "時",
        meanings: &["time", "hour"],
        onyomi: &["ジ"],
        kunyomi: &["とき"],
        examples: &[("時間", "じかん", "time"), ("何時", "なんじ", "what time")],
    },
    StaticKanji {
        character: "見",
        meanings: &["see", "look", "watch"],
        onyomi: &["ケン"],
        kunyomi: &["み"],
        examples: &[("見る", "みる", "to see"), ("意見", "いけん", "opinion")],
    },
    StaticKanji {
        character: "行",
        meanings: &["go", "conduct", "carry out"],
        onyomi: &["コウ", "ギョウ"],
        kunyomi: &["い", "ゆ"],
        examples: &[("行く", "いく", "to go"), ("銀行", "ぎんこう", "bank")],
    },
    StaticKanji {
        character: "来",
        meanings: &["come", "next"],
        onyomi: &["ライ"],
        kunyomi: &["く", "き"],
        examples: &[("来る", "くる", "to come"), ("来年", "らいねん", "next year")],
    },
    StaticKanji {
        character: "車",
        meanings: &["car", "vehicle", "wheel"],
        onyomi: &["シャ"],
        kunyomi: &["くるま"],
        examples: &[("車", "くるま", "car"), ("電車", "でんしゃ", "train")],
    },
];

const N4: &[StaticKanji] = &[
    StaticKanji {
        character: "思",
        meanings: &["think", "thought"],
        onyomi: &["シ"],
        kunyomi: &["おも"],
        examples: &[("思う", "おもう", "to think"), ("思想", "しそう", "thought, idea")],
    },
    StaticKanji {
        character: "言",
        meanings: &["say", "word", "speech"],
        onyomi: &["ゲン", "ゴン"],
        kunyomi: &["い", "こと"],
        examples: &[("言う", "いう", "to say"), ("言葉", "ことば", "word, language")],
    },
    StaticKanji {
        character: "考",
        meanings: &["think", "consider"],
        onyomi: &["コウ"],
        kunyomi: &["かんが"],
        examples: &[("考える", "かんがえる", "to think"), ("考え", "かんがえ", "thought, idea")],
    },
];

const N3: &[StaticKanji] = &[StaticKanji {
    character: "理",
    meanings: &["logic", "reason", "truth"],
    onyomi: &["リ"],
    kunyomi: &[],
    examples: &[("理由", "りゆう", "reason"), ("料理", "りょうり", "cooking")],
}];

const N2: &[StaticKanji] = &[StaticKanji {
    character: "議",
    meanings: &["deliberation", "consultation", "debate"],
    onyomi: &["ギ"],
    kunyomi: &[],
    examples: &[("会議", "かいぎ", "meeting"), ("議論", "ぎろん", "discussion")],
}];

const N1: &[StaticKanji] = &[StaticKanji {
    character: "憲",
    meanings: &["constitution", "law"],
    onyomi: &["ケン"],
    kunyomi: &[],
    examples: &[("憲法", "けんぽう", "constitution"), ("立憲", "りっけん", "constitutional")],
}];

fn table(level: &str) -> Option<&'static [StaticKanji]> {
    match level {
        "N5" => Some(N5),
        "N4" => Some(N4),
        "N3" => Some(N3),
        "N2" => Some(N2),
        "N1" => Some(N1),
        _ => None,
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl StaticKanji {
    fn to_entry(&self, level: &str) -> KanjiEntry {
        KanjiEntry {
            character: self.character.to_string(),
            meanings: to_strings(self.meanings),
            on_readings: to_strings(self.onyomi),
            kun_readings: to_strings(self.kunyomi),
            level: level.to_string(),
            examples: self
                .examples
                .iter()
                .map(|(word, reading, meaning)| Example {
                    word: word.to_string(),
                    reading: reading.to_string(),
                    meaning: meaning.to_string(),
                })
                .collect(),
        }
    }
}

/// Built-in entries for `level`, or `None` if the level has no table.
pub fn level_entries(level: &str) -> Option<Vec<KanjiEntry>> {
    table(level).map(|kanji| kanji.iter().map(|k| k.to_entry(level)).collect())
}

pub fn level_count(level: &str) -> usize {
    table(level).map(<[StaticKanji]>::len).unwrap_or(0)
}
