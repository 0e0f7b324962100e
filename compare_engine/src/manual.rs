/*!

This is the long-form manual for `compare_engine` and `votecompare`.

## Data

The engine reads three collections through a [`DocumentStore`](crate::store::DocumentStore):

* topic registries, one per election: `{"id": "t1", "title": "Health"}`
* candidates: `{"id": "c1", "electionId": "E1", "name": "Ana", "party": "Green"}`
* proposals: `{"id": "p1", "candidateId": "c1", "electionId": "E1", "topic": "Health", "title": "..."}`

Proposals were written by several versions of the administration tools, and
their `electionId` field comes in several shapes:

| shape                         | example                    | matches `E1` |
|-------------------------------|----------------------------|--------------|
| string                        | `"E1 "`                    | yes (trimmed) |
| reference object              | `{"id": "E1", "path": ...}` | yes (exact id) |
| other scalar                  | `42`                       | if it reads as the id |
| missing, null, empty          |                            | never        |

The `votecompare` command line reads the same collections from JSON files:

```json
{
  "topics": {"E1": [{"id": "t1", "title": "Health"}]},
  "candidates": [...],
  "proposals": [...]
}
```

## Topics

The topics of an election come from the first of these that has something:

1. the topic registry of the election, as stored
2. the `topic` (or `type`) keywords of the proposals stored with the election id
3. the keywords of every proposal whose election reference matches, whatever its shape

Keywords are deduplicated without regard to case or accents; the first spelling
seen is the one displayed.

## Comparing

A candidate has *answered* a topic when at least one of their proposals for the
election has a `topic` or `type` containing the topic, compared without case and
accents. `"Educación"` matches `"educacion-y-cultura"`.

Every requested candidate gets an entry, in the order requested. A candidate
whose proposals cannot be read is reported as not answered; only a store that
cannot be reached at all makes the comparison fail.

## Tournaments

Participants are paired in order. When the number of participants is not a power
of two, the bracket is completed with byes and a candidate facing a bye moves on
by itself. A match between two candidates has no winner until one is picked.

An undecided match leaves an empty slot in the next round, and an empty slot is
read as a bye: with `c1, c2, c3`, `c3` reaches the final and wins it by itself as
long as `0-0` is undecided. Picking the winner of `0-0` puts them in the final
and makes the final undecided again.

Matches are named `<round>-<match>`, starting at `0-0`. The winner of match
`r-m` plays in slot `m % 2` of match `(r+1)-(m/2)`, and a winner dragged onto a
slot is only accepted from that match.

Decisions only hold for the bracket they were made on: a new topic or a new set
of participants starts the tournament over.

## Command line

```bash
votecompare --input data.json --election E1 --mode topics
votecompare --input data.json --election E1 --topic salud --candidates c1,c2 --mode compare
votecompare --input data.json --election E1 --topic salud --candidates c1,c2,c3 \
    --decision 0-0=c2 --mode tournament
```

A configuration file can hold the same settings:

```json
{
  "dataSources": [{"provider": "json", "filePath": "data.json"}],
  "electionId": "E1",
  "topic": "salud",
  "candidateIds": ["c1", "c2", "c3"],
  "decisions": {"0-0": "c2"},
  "mode": "tournament",
  "rules": {"restrictCandidatesToElection": true, "minimumParticipants": 2, "proposalPreviewLimit": 2}
}
```

Paths in `dataSources` are relative to the configuration file. Options given on
the command line take precedence. With `--reference`, the output is checked
against an expected summary and any difference is printed.

*/
